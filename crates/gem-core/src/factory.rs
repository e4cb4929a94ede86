//! Type factory
//!
//! Wraps the composition engine: composes a definition onto its parents,
//! attaches the shared statics and registers the result as an instance of
//! the flavor's meta type.

use crate::compose::{compose, Composition, Definition, StaticOverrides};
use crate::runtime::Gem;
use crate::types::{Flavor, Statics, TypeDescriptor, TypeId, TypeTest};
use crate::{GemError, GemResult};
use std::fmt;
use std::rc::Rc;

/// Closure deriving a type name from the parents and merged bundle
pub type NameFn = Rc<dyn Fn(&Gem, &Composition) -> String>;

/// How a produced type is named
#[derive(Clone)]
pub enum TypeName {
    /// A fixed name
    Fixed(String),
    /// A name computed once the bundle is composed
    Derived(NameFn),
    /// The flavor's meta type name
    Anonymous,
}

impl TypeName {
    /// Name derived from the composed bundle
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&Gem, &Composition) -> String + 'static,
    {
        TypeName::Derived(Rc::new(f))
    }

    fn resolve(&self, gem: &Gem, flavor: Flavor, composition: &Composition) -> String {
        match self {
            TypeName::Fixed(name) => name.clone(),
            TypeName::Derived(f) => f(gem, composition),
            TypeName::Anonymous => flavor.meta_name().to_string(),
        }
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Fixed(name) => write!(f, "Fixed({})", name),
            TypeName::Derived(_) => write!(f, "Derived(..)"),
            TypeName::Anonymous => write!(f, "Anonymous"),
        }
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        TypeName::Fixed(name.to_string())
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        TypeName::Fixed(name)
    }
}

impl From<Option<&str>> for TypeName {
    fn from(name: Option<&str>) -> Self {
        name.map(TypeName::from).unwrap_or(TypeName::Anonymous)
    }
}

/// Factory producing types of one flavor
#[derive(Clone, Copy)]
pub struct TypeFactory<'g> {
    gem: &'g Gem,
    flavor: Flavor,
}

impl<'g> TypeFactory<'g> {
    pub(crate) fn new(gem: &'g Gem, flavor: Flavor) -> Self {
        Self { gem, flavor }
    }

    /// Flavor of produced types
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Meta type every produced type is an instance of
    pub fn meta(&self) -> TypeId {
        self.gem.builtins().meta.for_flavor(self.flavor)
    }

    /// Compose and register a new type
    pub fn build(
        &self,
        name: impl Into<TypeName>,
        parents: &[TypeId],
        definition: Definition,
    ) -> GemResult<TypeId> {
        let gem = self.gem;
        match self.flavor {
            Flavor::Meta | Flavor::Primitive => {
                return Err(GemError::Definition(format!(
                    "{:?} types are registered at bootstrap",
                    self.flavor
                )))
            }
            Flavor::Extension if parents.is_empty() => {
                return Err(GemError::Definition(
                    "an extension needs a base type".to_string(),
                ))
            }
            _ => {}
        }
        for parent in parents {
            if gem.descriptor(*parent)?.flavor() == Flavor::Meta {
                return Err(GemError::MetaType {
                    name: gem.type_name(*parent),
                });
            }
        }

        let overrides = definition.statics.clone();
        let composition = compose(gem, parents, definition)?;
        let name = name.into().resolve(gem, self.flavor, &composition);
        let statics = self.statics(overrides)?;

        gem.registry().register(TypeDescriptor {
            id: gem.registry().next_id(),
            name,
            flavor: self.flavor,
            meta: self.meta(),
            native_parent: None,
            primitive: None,
            composition,
            statics,
        })
    }

    fn statics(&self, overrides: StaticOverrides) -> GemResult<Statics> {
        let mut statics = Statics::new();
        if let Some(pattern) = &overrides.expression {
            statics = statics.with_expression(pattern)?;
        }
        statics.parse = overrides.parse;
        statics.stringify = overrides.stringify;
        statics.serialise = overrides.serialise;
        statics.test = match (overrides.refine, self.flavor) {
            (Some(predicate), _) => TypeTest::Refined(predicate),
            (None, Flavor::Interface) => TypeTest::Structural,
            (None, _) => TypeTest::Nominal,
        };
        Ok(statics)
    }
}
