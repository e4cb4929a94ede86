//! Type arena
//!
//! Descriptors are appended and never removed. A type's parents are always
//! registered before it, so parent handles are strictly smaller than the
//! child's and the ancestry graph cannot contain cycles.

use super::descriptor::{TypeDescriptor, TypeId};
use crate::{GemError, GemResult};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Registry of every type known to a runtime
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RefCell<Vec<Rc<TypeDescriptor>>>,
    names: RefCell<FxHashMap<String, TypeId>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the next registered type will receive
    pub(crate) fn next_id(&self) -> TypeId {
        TypeId(self.types.borrow().len() as u32)
    }

    /// Append a descriptor; its id must be `next_id()`
    pub(crate) fn register(&self, desc: TypeDescriptor) -> GemResult<TypeId> {
        let id = self.next_id();
        if desc.id != id {
            return Err(GemError::Definition(format!(
                "descriptor for {} was prepared as {} but the next slot is {}",
                desc.name, desc.id, id
            )));
        }
        if let Some(bad) = desc.parents().iter().find(|p| **p >= id) {
            return Err(GemError::UnknownType(*bad));
        }
        log::debug!("registered type {} as {} ({:?})", desc.name, id, desc.flavor);
        self.names.borrow_mut().insert(desc.name.clone(), id);
        self.types.borrow_mut().push(Rc::new(desc));
        Ok(id)
    }

    /// Descriptor by handle
    pub fn get(&self, id: TypeId) -> Option<Rc<TypeDescriptor>> {
        self.types.borrow().get(id.index()).cloned()
    }

    /// Descriptor by handle, failing on unknown handles
    pub fn require(&self, id: TypeId) -> GemResult<Rc<TypeDescriptor>> {
        self.get(id).ok_or(GemError::UnknownType(id))
    }

    /// Latest type registered under `name`
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.names.borrow().get(name).copied()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.borrow().len()
    }

    /// Check if no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.borrow().is_empty()
    }

    /// Name of a type, or `?` for unknown handles
    pub fn name_of(&self, id: TypeId) -> String {
        self.types
            .borrow()
            .get(id.index())
            .map(|d| d.name.clone())
            .unwrap_or_else(|| "?".to_string())
    }
}
