//! Field descriptors, accessors and methods

mod accessor;
mod field;
mod flags;
mod method;
mod store;

pub use accessor::PropertyAccessor;
pub use field::{
    Access, Change, ChangeFn, FieldContext, FieldSpec, GetterFn, SetContext, SetterFn, TypeRef,
    TypeThunk,
};
pub use flags::{parse_key, FieldFlags};
pub use method::{MethodFn, MethodSpec, ParamSpec};
pub use store::ExternalStore;
