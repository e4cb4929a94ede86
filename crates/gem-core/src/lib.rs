//! GEM Core Runtime
//!
//! This crate provides the runtime type composition engine:
//! - Field descriptors and the property accessors compiled from them
//! - The composition engine (parents + definition → descriptor bundle)
//! - The type factory (composable, abstract, model, extension, interface)
//! - The construction/validation kernel
//! - The primitive type table and the deferred change-notification queue
//!
//! # Example
//!
//! ```rust,ignore
//! use gem_core::{Definition, Gem, Value};
//!
//! let gem = Gem::new()?;
//! let text = gem.builtins().text;
//! let number = gem.builtins().number;
//!
//! let person = gem.model(
//!     "Person",
//!     &[],
//!     Definition::new().field("name*", text).field("age?", number),
//! )?;
//!
//! let ann = gem.instantiate(person, &[Value::record([("name", "Ann")])])?;
//! assert_eq!(ann.get(&gem, "age")?, Value::Null);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::type_complexity)]
#![allow(clippy::new_without_default)]

pub mod compose;
pub mod descriptor;
pub mod events;
pub mod factory;
pub mod json;
pub mod kernel;
pub mod metadata;
pub mod object;
pub mod options;
pub mod runtime;
pub mod scheduler;
pub mod types;
pub mod value;

pub use compose::{Composition, Definition, Entry};
pub use descriptor::{
    Access, Change, ExternalStore, FieldContext, FieldFlags, FieldSpec, MethodSpec, ParamSpec,
    PropertyAccessor, SetContext, TypeRef,
};
pub use events::{Broadcaster, ListenerId};
pub use factory::{TypeFactory, TypeName};
pub use metadata::{FieldMetadata, MethodMetadata, ParamMetadata, TypeMetadata};
pub use object::Instance;
pub use options::{GemOptions, KeyMarkers};
pub use runtime::Gem;
pub use scheduler::{NotifyQueue, TickReport};
pub use types::{
    Builtins, Flavor, MetaTypes, PrimitiveKind, PrimitiveSpec, PrimitiveTable, Statics,
    TypeDescriptor, TypeId, TypeRegistry, TypeTest,
};
pub use value::{Callable, Value};

/// Errors raised by composition, construction and field access
///
/// Every variant is a contract violation raised synchronously at the point
/// of failure; nothing in the core retries or recovers from them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GemError {
    /// A value failed a field's type/nullable contract on write
    #[error("Assignment error: {owner} @ {key}:{expected}{modifier} cannot accept {value} of {received}")]
    Assignment {
        /// Type owning the field
        owner: String,
        /// Field key
        key: String,
        /// Declared field type
        expected: String,
        /// Declared modifier (`*`, `?` or empty)
        modifier: &'static str,
        /// Short rendering of the rejected value
        value: String,
        /// Type of the rejected value
        received: String,
        /// Conversion failure that caused the rejection
        #[source]
        cause: Option<Box<GemError>>,
    },

    /// A required field was missing or null at verification
    #[error("Required property error: missing value on {owner} -> property {key} of {expected} is required")]
    RequiredProperty {
        /// Type being verified
        owner: String,
        /// Field key
        key: String,
        /// Declared field type
        expected: String,
    },

    /// An assigned key has no field declaration
    #[error("Undefined property error: property with key {key} is not defined by {owner}")]
    UndefinedProperty {
        /// Type being verified
        owner: String,
        /// Offending key
        key: String,
    },

    /// `inherit` was called with a type that is not a declared parent
    #[error("Parent inheritance error: {parent} is not defined as a parent of {owner}")]
    Inherit {
        /// Type of the delegating instance
        owner: String,
        /// Requested parent
        parent: String,
    },

    /// `super` was called with the wrong number of argument bundles
    #[error("Multiple inheritance error: {owner} has {parents} parents defined but argument collection is of size {bundles}")]
    MultiInherit {
        /// Type of the delegating instance
        owner: String,
        /// Number of declared parents
        parents: usize,
        /// Number of bundles received
        bundles: usize,
    },

    /// An abstract or interface type was constructed directly
    #[error("Abstract class construct error: cannot construct abstract {name} directly, it must be inherited")]
    Abstract {
        /// Abstract type name
        name: String,
    },

    /// A write was attempted on a get-only field
    #[error("Read only error: cannot set value of read-only property {key} on {owner}")]
    ReadOnly {
        /// Type owning the field
        owner: String,
        /// Field key
        key: String,
    },

    /// A type's string-to-value conversion failed
    #[error("{type_name} parse error: {input:?} cannot be parsed as a {type_name} ({reason})")]
    Parse {
        /// Target type
        type_name: String,
        /// Rejected input
        input: String,
        /// Why the conversion failed
        reason: String,
    },

    /// A typed method received an argument of the wrong type
    #[error("Argument error: parameter {param} expects a {expected} but received a {received}")]
    Argument {
        /// Parameter name
        param: String,
        /// Declared parameter type
        expected: String,
        /// Type of the received argument
        received: String,
    },

    /// A typed method returned a value of the wrong type
    #[error("Return type error: the method {owner}.{method}(...) should return a {expected} but returned a {received}")]
    Return {
        /// Type owning the method
        owner: String,
        /// Method name
        method: String,
        /// Declared return type
        expected: String,
        /// Type of the returned value
        received: String,
    },

    /// A meta type was constructed like an ordinary type
    #[error("\"{name}\" meta type constructor error: meta types build types through their factory, not instances")]
    MetaType {
        /// Meta type name
        name: String,
    },

    /// A definition could not be composed
    #[error("Definition error: {0}")]
    Definition(String),

    /// A declared field type could not be resolved
    #[error("Unresolved type: {0}")]
    UnresolvedType(String),

    /// A type handle does not name a registered type
    #[error("Unknown type: {0}")]
    UnknownType(TypeId),

    /// A method was called that the type does not define
    #[error("Unknown method: {owner} has no method {method}")]
    UnknownMethod {
        /// Type of the receiver
        owner: String,
        /// Requested method
        method: String,
    },

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate
pub type GemResult<T> = Result<T, GemError>;
