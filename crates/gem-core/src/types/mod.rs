//! Type descriptors, the type arena and the primitive table

mod ancestry;
mod bootstrap;
mod descriptor;
mod primitives;
mod registry;
mod statics;

pub use bootstrap::{Builtins, MetaTypes};
pub(crate) use bootstrap::register_builtins;
pub use descriptor::{Flavor, TypeDescriptor, TypeId};
pub use primitives::{PrimitiveKind, PrimitiveSpec, PrimitiveTable};
pub use registry::TypeRegistry;
pub use statics::{ParseFn, PredicateFn, SerialiseFn, Statics, StringifyFn, TypeTest};
