//! Fields backed by external key/value stores
//!
//! The store holds text only. Reads go through the field type's `parse`,
//! writes through its `stringify`.

use super::field::{FieldSpec, TypeRef};
use crate::object::Instance;
use crate::value::Value;
use std::rc::Rc;

/// Text key/value store owned outside the runtime
pub trait ExternalStore {
    /// Stored text for `key`
    fn read(&self, key: &str) -> Option<String>;

    /// Replace the stored text for `key`
    fn write(&self, key: &str, value: &str);
}

impl FieldSpec {
    /// Field whose value lives in the store returned by `resolver`
    ///
    /// A missing entry reads as null. Writing null leaves the store as is.
    pub fn backed_by<F>(ty: impl Into<TypeRef>, resolver: F) -> Self
    where
        F: Fn(&Instance) -> Rc<dyn ExternalStore> + 'static,
    {
        let resolver = Rc::new(resolver);
        let read_resolver = resolver.clone();

        FieldSpec::new(ty)
            .get_with(move |gem, ctx| {
                let store = read_resolver(ctx.target);
                match store.read(ctx.key) {
                    Some(text) => gem.parse(ctx.ty, &text),
                    None => Ok(Value::Null),
                }
            })
            .set_with(move |gem, ctx| {
                if !ctx.to.is_nullish() {
                    let text = gem.stringify(ctx.ty, ctx.to)?;
                    resolver(ctx.target).write(ctx.key, &text);
                }
                Ok(ctx.to.clone())
            })
    }
}
