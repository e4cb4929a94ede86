//! Registered type descriptors

use super::primitives::PrimitiveKind;
use super::statics::Statics;
use crate::compose::Composition;
use crate::descriptor::{FieldSpec, MethodSpec, PropertyAccessor};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Handle into the type arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Constructor strategy of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// A type whose instances are types
    Meta,
    /// Built-in value type
    Primitive,
    /// Delegates to every parent, then runs the kernel
    Composable,
    /// Usable only as a base
    Abstract,
    /// Data record built by the kernel
    Model,
    /// Single-base extension
    Extension,
    /// Abstract with structural validation
    Interface,
}

impl Flavor {
    /// Name of the meta type producing types of this flavor
    pub fn meta_name(self) -> &'static str {
        match self {
            Flavor::Meta => "Type",
            Flavor::Primitive | Flavor::Composable => "Composition",
            Flavor::Abstract => "Abstract",
            Flavor::Model => "Model",
            Flavor::Extension => "Source",
            Flavor::Interface => "Interface",
        }
    }

    /// Check if instances can be constructed directly
    pub fn is_constructible(self) -> bool {
        !matches!(self, Flavor::Abstract | Flavor::Interface | Flavor::Meta)
    }
}

/// A registered type
pub struct TypeDescriptor {
    pub(crate) id: TypeId,
    pub(crate) name: String,
    pub(crate) flavor: Flavor,
    pub(crate) meta: TypeId,
    pub(crate) native_parent: Option<TypeId>,
    pub(crate) primitive: Option<PrimitiveKind>,
    pub(crate) composition: Composition,
    pub(crate) statics: Statics,
}

impl TypeDescriptor {
    /// Type handle
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructor strategy
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Meta type this type is an instance of
    pub fn meta(&self) -> TypeId {
        self.meta
    }

    /// Ordered parents
    pub fn parents(&self) -> &[TypeId] {
        &self.composition.parents
    }

    /// Native chain link (primitives and refinements)
    pub fn native_parent(&self) -> Option<TypeId> {
        self.native_parent
    }

    /// Primitive kind, for primitive types
    pub fn primitive(&self) -> Option<PrimitiveKind> {
        self.primitive
    }

    /// Merged field specs
    pub fn prescriptor(&self) -> &IndexMap<String, Rc<FieldSpec>> {
        &self.composition.prescriptor
    }

    /// Merged property accessors
    pub fn properties(&self) -> &IndexMap<String, Rc<PropertyAccessor>> {
        &self.composition.properties
    }

    /// Merged methods
    pub fn methods(&self) -> &IndexMap<String, Rc<MethodSpec>> {
        &self.composition.methods
    }

    /// Merged literal defaults
    pub fn defaults(&self) -> &IndexMap<String, crate::Value> {
        &self.composition.defaults
    }

    /// Merged event listeners
    pub fn listeners(&self) -> &IndexMap<String, Vec<Rc<MethodSpec>>> {
        &self.composition.listeners
    }

    /// Shared statics
    pub fn statics(&self) -> &Statics {
        &self.statics
    }

    /// Field spec by key
    pub fn field(&self, key: &str) -> Option<&Rc<FieldSpec>> {
        self.composition.prescriptor.get(key)
    }

    /// Property accessor by key
    pub fn property(&self, key: &str) -> Option<Rc<PropertyAccessor>> {
        self.composition.properties.get(key).cloned()
    }

    /// Method by name
    pub fn method(&self, name: &str) -> Option<Rc<MethodSpec>> {
        self.composition.methods.get(name).cloned()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("flavor", &self.flavor)
            .field("parents", &self.composition.parents)
            .field("fields", &self.composition.prescriptor.len())
            .field("methods", &self.composition.methods.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_meta_names() {
        assert_eq!(Flavor::Model.meta_name(), "Model");
        assert_eq!(Flavor::Extension.meta_name(), "Source");
        assert_eq!(Flavor::Composable.meta_name(), "Composition");
    }

    #[test]
    fn test_flavor_constructibility() {
        assert!(Flavor::Model.is_constructible());
        assert!(!Flavor::Interface.is_constructible());
        assert!(!Flavor::Abstract.is_constructible());
    }

    #[test]
    fn test_flavor_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Flavor::Extension).unwrap(), "\"extension\"");
    }
}
