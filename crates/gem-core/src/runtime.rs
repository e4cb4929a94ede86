//! The runtime
//!
//! A `Gem` owns the type arena, the notification queue and the options.
//! It is single-threaded: values and types are shared with `Rc`, and the
//! runtime itself is neither `Send` nor `Sync`.

use crate::compose::Definition;
use crate::factory::{TypeFactory, TypeName};
use crate::kernel;
use crate::object::Instance;
use crate::options::GemOptions;
use crate::scheduler::{NotifyQueue, TickReport};
use crate::types::{register_builtins, Builtins, Flavor, TypeDescriptor, TypeId, TypeRegistry};
use crate::value::Value;
use crate::{GemError, GemResult};
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::Rc;

/// Runtime owning every type and the deferred notification queue
pub struct Gem {
    registry: TypeRegistry,
    queue: NotifyQueue,
    options: GemOptions,
    builtins: Builtins,
    /// (type, value address) pairs under an in-progress structural test
    pub(crate) structural_path: RefCell<FxHashSet<(TypeId, usize)>>,
}

impl Gem {
    /// Runtime with the standard options
    pub fn new() -> GemResult<Self> {
        Self::with_options(GemOptions::default())
    }

    /// Runtime with custom options
    pub fn with_options(options: GemOptions) -> GemResult<Self> {
        options.markers.validate()?;
        let registry = TypeRegistry::new();
        let builtins = register_builtins(&registry, &options.primitives)?;
        Ok(Self {
            registry,
            queue: NotifyQueue::new(),
            options,
            builtins,
            structural_path: RefCell::new(FxHashSet::default()),
        })
    }

    /// Active options
    pub fn options(&self) -> &GemOptions {
        &self.options
    }

    /// Handles of the built-in types
    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Type arena
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Deferred notification queue
    pub fn notifications(&self) -> &NotifyQueue {
        &self.queue
    }

    /// Descriptor of a registered type
    pub fn descriptor(&self, ty: TypeId) -> GemResult<Rc<TypeDescriptor>> {
        self.registry.require(ty)
    }

    /// Latest type registered under `name`
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.registry.lookup(name)
    }

    /// Name of a type
    pub fn type_name(&self, ty: TypeId) -> String {
        self.registry.name_of(ty)
    }

    /// Type of a value; none for null and undefined
    pub fn type_of(&self, value: &Value) -> Option<TypeId> {
        let b = &self.builtins;
        match value {
            Value::Undefined | Value::Null => None,
            Value::Bool(_) => Some(b.boolean),
            Value::Number(_) => Some(b.number),
            Value::BigInt(_) => Some(b.bigint),
            Value::Text(_) => Some(b.text),
            Value::Timestamp(_) => Some(b.timestamp),
            Value::List(_) => Some(b.list),
            Value::Set(_) => Some(b.set),
            Value::Map(_) => Some(b.map),
            Value::Record(_) => Some(b.record),
            Value::Callable(_) => Some(b.callable),
            Value::Instance(instance) => Some(instance.type_id()),
            Value::Type(id) => self.registry.get(*id).map(|d| d.meta()),
        }
    }

    /// Name of a value's type, for diagnostics
    pub fn type_name_of(&self, value: &Value) -> String {
        match self.type_of(value) {
            Some(ty) => self.type_name(ty),
            None => value.kind_name().to_string(),
        }
    }

    /// Check if `ancestor` is `ty` or one of its ancestors
    pub fn is_same_or_ancestor(&self, ty: TypeId, ancestor: TypeId) -> bool {
        self.registry
            .is_same_or_ancestor(ty, ancestor, self.builtins.record)
    }

    /// Check if text is stored as-is by fields of `ty`
    pub fn is_text_compatible(&self, ty: TypeId) -> bool {
        self.is_same_or_ancestor(ty, self.builtins.text)
    }

    /// Factory for a flavor
    pub fn factory(&self, flavor: Flavor) -> TypeFactory<'_> {
        TypeFactory::new(self, flavor)
    }

    /// Composable type: delegates to every parent, then runs the kernel
    pub fn compose(
        &self,
        name: impl Into<TypeName>,
        parents: &[TypeId],
        definition: Definition,
    ) -> GemResult<TypeId> {
        self.factory(Flavor::Composable).build(name, parents, definition)
    }

    /// Abstract type, usable only as a base
    pub fn abstract_type(
        &self,
        name: impl Into<TypeName>,
        parents: &[TypeId],
        definition: Definition,
    ) -> GemResult<TypeId> {
        self.factory(Flavor::Abstract).build(name, parents, definition)
    }

    /// Data record type
    pub fn model(
        &self,
        name: impl Into<TypeName>,
        parents: &[TypeId],
        definition: Definition,
    ) -> GemResult<TypeId> {
        self.factory(Flavor::Model).build(name, parents, definition)
    }

    /// Single-base extension
    pub fn extend(
        &self,
        name: impl Into<TypeName>,
        base: TypeId,
        definition: Definition,
    ) -> GemResult<TypeId> {
        self.factory(Flavor::Extension).build(name, &[base], definition)
    }

    /// Structural interface
    pub fn interface(
        &self,
        name: impl Into<TypeName>,
        parents: &[TypeId],
        definition: Definition,
    ) -> GemResult<TypeId> {
        self.factory(Flavor::Interface).build(name, parents, definition)
    }

    /// Construct a value of `ty`
    pub fn construct(&self, ty: TypeId, args: &[Value]) -> GemResult<Value> {
        kernel::construct(self, ty, args)
    }

    /// Construct an instance of a composed type
    pub fn instantiate(&self, ty: TypeId, args: &[Value]) -> GemResult<Instance> {
        match self.construct(ty, args)? {
            Value::Instance(instance) => Ok(instance),
            other => Err(GemError::Definition(format!(
                "{} constructs {} values, not instances",
                self.type_name(ty),
                other.kind_name()
            ))),
        }
    }

    /// Run `ty`'s constructor strategy on `target` without an ancestry check
    pub fn initialize_as(&self, target: &Instance, ty: TypeId, args: &[Value]) -> GemResult<()> {
        kernel::initialize(self, target, ty, args)
    }

    /// Default text rendering
    ///
    /// Instances render as `Name { key: value, .. }` over their enumerable
    /// fields; text nested in an instance is quoted. An instance already
    /// being rendered further up renders as `Name { .. }`.
    pub fn render(&self, value: &Value) -> GemResult<String> {
        self.render_on_path(value, &mut FxHashSet::default())
    }

    fn render_on_path(&self, value: &Value, path: &mut FxHashSet<u64>) -> GemResult<String> {
        match value {
            Value::Instance(instance) => {
                let name = instance.type_name();
                if !path.insert(instance.id()) {
                    return Ok(format!("{} {{ .. }}", name));
                }
                let entries = instance.entries(self)?;
                if entries.is_empty() {
                    path.remove(&instance.id());
                    return Ok(format!("{} {{}}", name));
                }
                let mut fields = Vec::with_capacity(entries.len());
                for (key, field) in &entries {
                    let rendered = match field {
                        Value::Text(s) => format!("{:?}", s.as_ref()),
                        other => self.render_on_path(other, path)?,
                    };
                    fields.push(format!("{}: {}", key, rendered));
                }
                path.remove(&instance.id());
                Ok(format!("{} {{ {} }}", name, fields.join(", ")))
            }
            Value::Type(id) => Ok(self.type_name(*id)),
            other => Ok(other.to_string()),
        }
    }

    /// Deliver the notifications queued before this call
    pub fn tick(&self) -> TickReport {
        self.queue.tick(self)
    }

    /// Tick until no notifications remain (bounded by `idle_tick_limit`)
    pub fn run_until_idle(&self) -> TickReport {
        self.queue.run_until_idle(self, self.options.idle_tick_limit)
    }

    /// Number of queued notifications
    pub fn pending_notifications(&self) -> usize {
        self.queue.len()
    }
}
