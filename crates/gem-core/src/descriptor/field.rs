//! Field descriptors
//!
//! A `FieldSpec` is built by the definition author, parsed once against the
//! key markers, then frozen behind an `Rc` when its type is composed.

use super::flags::{parse_key, FieldFlags};
use crate::events::{Broadcaster, ListenerId};
use crate::object::Instance;
use crate::options::KeyMarkers;
use crate::runtime::Gem;
use crate::types::TypeId;
use crate::value::Value;
use crate::{GemError, GemResult};
use once_cell::unsync::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Getter invoked when a field has no cached value and no default
pub type GetterFn = Rc<dyn Fn(&Gem, &FieldContext<'_>) -> GemResult<Value>>;
/// Setter producing the value to cache for a write
pub type SetterFn = Rc<dyn Fn(&Gem, &SetContext<'_>) -> GemResult<Value>>;
/// Deferred change listener
pub type ChangeFn = Rc<dyn Fn(&Gem, &Change) -> GemResult<()>>;
/// Deferred type resolution
pub type TypeThunk = Rc<dyn Fn(&Gem) -> Option<TypeId>>;

/// Read context passed to getters
pub struct FieldContext<'a> {
    /// Instance being read
    pub target: &'a Instance,
    /// Field key
    pub key: &'a str,
    /// Resolved field type
    pub ty: TypeId,
}

/// Write context passed to setters
pub struct SetContext<'a> {
    /// Instance being written
    pub target: &'a Instance,
    /// Field key
    pub key: &'a str,
    /// Resolved field type
    pub ty: TypeId,
    /// Admitted new value
    pub to: &'a Value,
    /// Value before the write
    pub from: &'a Value,
}

/// A committed field change, delivered to listeners on a later tick
#[derive(Debug, Clone)]
pub struct Change {
    /// Instance that changed
    pub target: Instance,
    /// Field key
    pub key: String,
    /// Resolved field type
    pub ty: TypeId,
    /// Previous value
    pub from: Value,
    /// New value
    pub to: Value,
}

/// Reference to a field's declared type
#[derive(Clone)]
pub enum TypeRef {
    /// Already registered type
    Id(TypeId),
    /// Type looked up by name on first use
    Named(String),
    /// Type produced by a thunk on first use
    Lazy(TypeThunk),
}

impl TypeRef {
    /// Lazily resolved type
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn(&Gem) -> Option<TypeId> + 'static,
    {
        TypeRef::Lazy(Rc::new(f))
    }

    pub(crate) fn resolve(&self, gem: &Gem) -> GemResult<TypeId> {
        match self {
            TypeRef::Id(id) => Ok(*id),
            TypeRef::Named(name) => gem
                .lookup(name)
                .ok_or_else(|| GemError::UnresolvedType(name.clone())),
            TypeRef::Lazy(thunk) => {
                thunk(gem).ok_or_else(|| GemError::UnresolvedType("<lazy>".to_string()))
            }
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Id(id) => write!(f, "{}", id),
            TypeRef::Named(name) => write!(f, "Named({})", name),
            TypeRef::Lazy(_) => write!(f, "Lazy(..)"),
        }
    }
}

impl From<TypeId> for TypeRef {
    fn from(id: TypeId) -> Self {
        TypeRef::Id(id)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Named(name.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::Named(name)
    }
}

/// Field access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Readable and writable
    ReadWrite,
    /// Writes fail with a read-only error
    ReadOnly,
}

/// Declaration of one field
#[derive(Clone)]
pub struct FieldSpec {
    key: Option<String>,
    ty: TypeRef,
    resolved: OnceCell<TypeId>,
    getter: Option<GetterFn>,
    setter: Option<SetterFn>,
    default_value: Option<Value>,
    flags: FieldFlags,
    access: Access,
    on_change: Broadcaster<ChangeFn>,
    builtin: bool,
}

impl FieldSpec {
    /// Field of the given type; reads as null until written
    pub fn new(ty: impl Into<TypeRef>) -> Self {
        Self {
            key: None,
            ty: ty.into(),
            resolved: OnceCell::new(),
            getter: None,
            setter: None,
            default_value: None,
            flags: FieldFlags::default(),
            access: Access::ReadWrite,
            on_change: Broadcaster::new(),
            builtin: false,
        }
    }

    /// Computed read-only field
    pub fn getter<F>(ty: impl Into<TypeRef>, f: F) -> Self
    where
        F: Fn(&Gem, &FieldContext<'_>) -> GemResult<Value> + 'static,
    {
        let mut spec = Self::new(ty);
        spec.getter = Some(Rc::new(f));
        spec.access = Access::ReadOnly;
        spec
    }

    /// Field inferred from a literal: the literal's type, with the literal
    /// as default; null and undefined give a nullable record field
    pub fn infer(gem: &Gem, literal: &Value) -> GemResult<Self> {
        match gem.type_of(literal) {
            Some(ty) => Ok(Self::new(ty).with_default(literal.clone())),
            None => Ok(Self::new(gem.builtins().record).nullable()),
        }
    }

    /// Admit null
    pub fn nullable(mut self) -> Self {
        self.flags.nullable = true;
        self
    }

    /// Require a value at verification
    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    /// Hide from enumeration
    pub fn private(mut self) -> Self {
        self.flags.private = true;
        self
    }

    /// Reject writes
    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    /// Value read before the first write
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Custom getter
    pub fn get_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Gem, &FieldContext<'_>) -> GemResult<Value> + 'static,
    {
        self.getter = Some(Rc::new(f));
        self
    }

    /// Custom setter; its result is what gets cached
    pub fn set_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Gem, &SetContext<'_>) -> GemResult<Value> + 'static,
    {
        self.setter = Some(Rc::new(f));
        self
    }

    /// Add a change listener
    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&Gem, &Change) -> GemResult<()> + 'static,
    {
        self.listen(f);
        self
    }

    /// Add a change listener, returning its handle
    pub fn listen<F>(&mut self, f: F) -> ListenerId
    where
        F: Fn(&Gem, &Change) -> GemResult<()> + 'static,
    {
        self.on_change.listen(Rc::new(f))
    }

    /// Remove a change listener
    pub fn unlisten(&mut self, id: ListenerId) -> bool {
        self.on_change.unlisten(id)
    }

    pub(crate) fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    /// Parse a raw definition key into this field's key and flags
    pub(crate) fn parse(mut self, raw: &str, markers: &KeyMarkers) -> GemResult<Self> {
        if let Some(key) = &self.key {
            return Err(GemError::Definition(format!(
                "field {} was already parsed, cannot parse it again as {:?}",
                key, raw
            )));
        }
        let (key, flags) = parse_key(raw, markers)?;
        self.key = Some(key);
        self.flags = self.flags.union(flags);
        Ok(self)
    }

    /// Field key, once parsed
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Declared type reference
    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    /// Modifier flags
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    /// Access mode
    pub fn access(&self) -> Access {
        self.access
    }

    /// Check for get-only access
    pub fn is_read_only(&self) -> bool {
        self.access == Access::ReadOnly
    }

    /// Default value, if any
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Check for built-in fields added by composition
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Check if a write would schedule notifications
    pub fn has_listeners(&self) -> bool {
        !self.on_change.is_empty()
    }

    /// Resolve the declared type; the result is cached
    pub fn resolve(&self, gem: &Gem) -> GemResult<TypeId> {
        self.resolved
            .get_or_try_init(|| self.ty.resolve(gem))
            .copied()
    }

    pub(crate) fn read(&self, gem: &Gem, ctx: &FieldContext<'_>) -> GemResult<Value> {
        match &self.getter {
            Some(getter) => getter(gem, ctx),
            None => Ok(Value::Null),
        }
    }

    pub(crate) fn write(&self, gem: &Gem, ctx: &SetContext<'_>) -> GemResult<Value> {
        match &self.setter {
            Some(setter) => setter(gem, ctx),
            None => Ok(ctx.to.clone()),
        }
    }

    /// Run change listeners; returns (delivered, failed)
    pub(crate) fn notify(&self, gem: &Gem, change: &Change) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;
        for listener in self.on_change.iter() {
            match listener(gem, change) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    log::warn!(
                        "change listener for {}.{} failed: {}",
                        change.target.type_name(),
                        change.key,
                        e
                    );
                    failed += 1;
                }
            }
        }
        (delivered, failed)
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("key", &self.key)
            .field("type", &self.ty)
            .field("flags", &self.flags)
            .field("access", &self.access)
            .field("default", &self.default_value)
            .field("listeners", &self.on_change.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_flags() {
        let spec = FieldSpec::new("Text").nullable().private();
        let flags = spec.flags();
        assert!(flags.nullable && flags.private && !flags.required);
        assert!(!spec.is_read_only());
        assert!(spec.key().is_none());
    }

    #[test]
    fn test_parse_merges_flags() {
        let spec = FieldSpec::new("Text")
            .private()
            .parse("name*", &KeyMarkers::default())
            .unwrap();
        assert_eq!(spec.key(), Some("name"));
        assert!(spec.flags().required && spec.flags().private);
    }

    #[test]
    fn test_parse_runs_once() {
        let markers = KeyMarkers::default();
        let spec = FieldSpec::new("Text").parse("name", &markers).unwrap();
        assert!(matches!(
            spec.parse("other", &markers),
            Err(GemError::Definition(_))
        ));
    }

    #[test]
    fn test_getter_fields_are_read_only() {
        let spec = FieldSpec::getter("Number", |_, _| Ok(Value::from(1)));
        assert!(spec.is_read_only());
        assert_eq!(spec.access(), Access::ReadOnly);
    }

    #[test]
    fn test_listen_and_unlisten() {
        let mut spec = FieldSpec::new("Text");
        let id = spec.listen(|_, _| Ok(()));
        assert!(spec.has_listeners());
        assert!(spec.unlisten(id));
        assert!(!spec.has_listeners());
    }
}
