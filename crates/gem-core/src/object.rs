//! Instances of composed types
//!
//! An instance owns its hidden field slots, the extra keys assigned during
//! construction and an optional native payload. Field behavior lives in the
//! type's shared accessors; instances only hold state.

use crate::events::channel_chain;
use crate::runtime::Gem;
use crate::types::TypeId;
use crate::value::Value;
use crate::{GemError, GemResult};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global object ID counter
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique object ID
fn generate_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
struct InstanceData {
    object_id: u64,
    type_id: TypeId,
    type_name: Rc<str>,
    slots: FxHashMap<String, Value>,
    extras: IndexMap<String, Value>,
    native: Option<Value>,
}

/// Shared handle to an instance
#[derive(Clone)]
pub struct Instance(Rc<RefCell<InstanceData>>);

impl Instance {
    /// Allocate an empty instance of `type_id`
    pub(crate) fn allocate(type_id: TypeId, type_name: Rc<str>) -> Self {
        Instance(Rc::new(RefCell::new(InstanceData {
            object_id: generate_object_id(),
            type_id,
            type_name,
            slots: FxHashMap::default(),
            extras: IndexMap::new(),
            native: None,
        })))
    }

    /// Unique object ID
    pub fn id(&self) -> u64 {
        self.0.borrow().object_id
    }

    /// Type this instance was constructed as
    pub fn type_id(&self) -> TypeId {
        self.0.borrow().type_id
    }

    /// Name of the instance's type
    pub fn type_name(&self) -> Rc<str> {
        self.0.borrow().type_name.clone()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared instance data
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn slot(&self, key: &str) -> Option<Value> {
        self.0.borrow().slots.get(key).cloned()
    }

    pub(crate) fn store_slot(&self, key: &str, value: Value) {
        self.0.borrow_mut().slots.insert(key.to_string(), value);
    }

    pub(crate) fn put_extra(&self, key: &str, value: Value) {
        self.0.borrow_mut().extras.insert(key.to_string(), value);
    }

    /// Value of an undeclared key assigned during construction
    pub fn extra(&self, key: &str) -> Option<Value> {
        self.0.borrow().extras.get(key).cloned()
    }

    /// Undeclared keys assigned during construction, in assignment order
    pub fn extra_keys(&self) -> Vec<String> {
        self.0.borrow().extras.keys().cloned().collect()
    }

    /// Native payload of an instance extending a primitive
    pub fn native(&self) -> Option<Value> {
        self.0.borrow().native.clone()
    }

    pub(crate) fn set_native(&self, value: Value) {
        self.0.borrow_mut().native = Some(value);
    }

    /// Read a field (or an extra key)
    pub fn get(&self, gem: &Gem, key: &str) -> GemResult<Value> {
        let desc = gem.descriptor(self.type_id())?;
        match desc.property(key) {
            Some(accessor) => accessor.get(gem, self),
            None => Ok(self.extra(key).unwrap_or_default()),
        }
    }

    /// Write a declared field through its accessor
    pub fn set(&self, gem: &Gem, key: &str, value: impl Into<Value>) -> GemResult<Value> {
        let desc = gem.descriptor(self.type_id())?;
        match desc.property(key) {
            Some(accessor) => accessor.set(gem, self, value.into()),
            None => Err(GemError::UndefinedProperty {
                owner: self.type_name().to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Write a key the way construction merges records: declared keys go
    /// through their accessor, anything else lands as an extra
    pub(crate) fn assign(&self, gem: &Gem, key: &str, value: Value) -> GemResult<()> {
        let desc = gem.descriptor(self.type_id())?;
        match desc.property(key) {
            Some(accessor) => accessor.set(gem, self, value).map(|_| ()),
            None => {
                self.put_extra(key, value);
                Ok(())
            }
        }
    }

    /// Call a method defined on the instance's type
    pub fn call(&self, gem: &Gem, method: &str, args: &[Value]) -> GemResult<Value> {
        let desc = gem.descriptor(self.type_id())?;
        match desc.method(method) {
            Some(m) => m.invoke(gem, self, args),
            None => Err(GemError::UnknownMethod {
                owner: self.type_name().to_string(),
                method: method.to_string(),
            }),
        }
    }

    /// Initialize this instance as one of its type's parents
    pub fn inherit(&self, gem: &Gem, parent: TypeId, args: &[Value]) -> GemResult<()> {
        crate::kernel::inherit(gem, self, parent, args)
    }

    /// Initialize this instance as every parent, one bundle per parent
    pub fn inherit_all(&self, gem: &Gem, bundles: &[Value]) -> GemResult<()> {
        crate::kernel::inherit_all(gem, self, bundles)
    }

    /// Run the type's listeners for `event`, then bubble to each `:` prefix
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, gem: &Gem, event: &str, payload: Value) -> GemResult<usize> {
        let desc = gem.descriptor(self.type_id())?;
        let mut invoked = 0;
        for channel in channel_chain(&event.to_ascii_lowercase()) {
            if let Some(listeners) = desc.listeners().get(channel) {
                for listener in listeners {
                    listener.invoke(gem, self, std::slice::from_ref(&payload))?;
                    invoked += 1;
                }
            }
        }
        Ok(invoked)
    }

    /// Enumerable fields in declaration order
    pub fn entries(&self, gem: &Gem) -> GemResult<Vec<(String, Value)>> {
        let desc = gem.descriptor(self.type_id())?;
        let mut out = Vec::new();
        for (key, accessor) in desc.properties() {
            if accessor.is_enumerable() {
                out.push((key.clone(), accessor.get(gem, self)?));
            }
        }
        Ok(out)
    }

    /// Nominal/structural instance test against `ty`
    pub fn is(&self, gem: &Gem, ty: TypeId) -> bool {
        gem.defines(ty, &Value::Instance(self.clone()))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Instance")
                .field("id", &data.object_id)
                .field("type", &data.type_name)
                .field("slots", &data.slots.len())
                .field("extras", &data.extras.len())
                .finish(),
            Err(_) => write!(f, "Instance(<borrowed>)"),
        }
    }
}
