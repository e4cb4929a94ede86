//! Type definitions as written by users

use crate::descriptor::{FieldSpec, MethodSpec, TypeRef};
use crate::object::Instance;
use crate::runtime::Gem;
use crate::types::{ParseFn, PredicateFn, SerialiseFn, StringifyFn, TypeDescriptor, TypeId};
use crate::value::Value;
use crate::GemResult;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// One definition entry
#[derive(Debug, Clone)]
pub enum Entry {
    /// A literal, callable, type handle or container value
    Value(Value),
    /// A bare type reference: a field of that type reading as null
    Type(TypeRef),
    /// A pre-built field
    Field(FieldSpec),
    /// A method (or a listener, when the key carries the listener marker)
    Method(MethodSpec),
}

impl From<Value> for Entry {
    fn from(v: Value) -> Self {
        match v {
            Value::Type(id) => Entry::Type(TypeRef::Id(id)),
            other => Entry::Value(other),
        }
    }
}

impl From<TypeId> for Entry {
    fn from(id: TypeId) -> Self {
        Entry::Type(TypeRef::Id(id))
    }
}

impl From<TypeRef> for Entry {
    fn from(ty: TypeRef) -> Self {
        Entry::Type(ty)
    }
}

impl From<FieldSpec> for Entry {
    fn from(f: FieldSpec) -> Self {
        Entry::Field(f)
    }
}

impl From<MethodSpec> for Entry {
    fn from(m: MethodSpec) -> Self {
        Entry::Method(m)
    }
}

impl From<f64> for Entry {
    fn from(n: f64) -> Self {
        Entry::Value(Value::Number(n))
    }
}

impl From<i32> for Entry {
    fn from(n: i32) -> Self {
        Entry::Value(Value::from(n))
    }
}

impl From<bool> for Entry {
    fn from(b: bool) -> Self {
        Entry::Value(Value::Bool(b))
    }
}

impl From<&str> for Entry {
    fn from(s: &str) -> Self {
        Entry::Value(Value::text(s))
    }
}

/// Static conversions and tests overridden by a definition
#[derive(Clone, Default)]
pub(crate) struct StaticOverrides {
    pub(crate) expression: Option<String>,
    pub(crate) parse: Option<ParseFn>,
    pub(crate) stringify: Option<StringifyFn>,
    pub(crate) serialise: Option<SerialiseFn>,
    pub(crate) refine: Option<PredicateFn>,
}

/// Ordered set of definition entries plus static overrides
#[derive(Clone, Default)]
pub struct Definition {
    pub(crate) entries: IndexMap<String, Entry>,
    pub(crate) listeners: Vec<(String, MethodSpec)>,
    pub(crate) statics: StaticOverrides,
}

impl Definition {
    /// Empty definition
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry under a raw key (markers included)
    ///
    /// A repeated key replaces the earlier entry.
    pub fn field(mut self, key: &str, entry: impl Into<Entry>) -> Self {
        self.entries.insert(key.to_string(), entry.into());
        self
    }

    /// Add an untyped method
    pub fn method<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&Gem, &Instance, &[Value]) -> GemResult<Value> + 'static,
    {
        self.field(name, MethodSpec::new(body))
    }

    /// Add a listener for `event` without spelling the listener marker
    pub fn listener<F>(mut self, event: &str, body: F) -> Self
    where
        F: Fn(&Gem, &Instance, &[Value]) -> GemResult<Value> + 'static,
    {
        self.listeners
            .push((event.to_string(), MethodSpec::new(body)));
        self
    }

    /// Validation expression for the `validate` static
    pub fn expression(mut self, pattern: &str) -> Self {
        self.statics.expression = Some(pattern.to_string());
        self
    }

    /// Override the `parse` static
    pub fn parse_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Gem, &TypeDescriptor, &str) -> GemResult<Value> + 'static,
    {
        self.statics.parse = Some(Rc::new(f));
        self
    }

    /// Override the `stringify` static
    pub fn stringify_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Gem, &TypeDescriptor, &Value) -> GemResult<String> + 'static,
    {
        self.statics.stringify = Some(Rc::new(f));
        self
    }

    /// Override the `serialise` static
    pub fn serialise_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Gem, &TypeDescriptor, &Value) -> GemResult<Value> + 'static,
    {
        self.statics.serialise = Some(Rc::new(f));
        self
    }

    /// Replace the nominal type test with a predicate
    pub fn defines_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.statics.refine = Some(Rc::new(f));
        self
    }

    /// Raw keys in definition order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries (listeners added with `listener` excluded)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for an empty definition
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.listeners.is_empty()
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("entries", &self.entries)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
