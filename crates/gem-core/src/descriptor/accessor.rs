//! Property accessors
//!
//! One accessor is compiled per field when a type is composed and shared by
//! every instance (and every descendant type that inherits the field). All
//! per-instance state lives in the instance's hidden slots.

use super::field::{Change, FieldContext, FieldSpec, SetContext};
use crate::object::Instance;
use crate::runtime::Gem;
use crate::scheduler::Notification;
use crate::types::TypeId;
use crate::value::Value;
use crate::{GemError, GemResult};
use std::fmt;
use std::rc::Rc;

/// Compiled get/set pair for one field
pub struct PropertyAccessor {
    key: String,
    field: Rc<FieldSpec>,
    enumerable: bool,
    configurable: bool,
}

impl PropertyAccessor {
    /// Compile an accessor for a parsed field
    pub fn compile(field: Rc<FieldSpec>) -> GemResult<Self> {
        let key = field
            .key()
            .ok_or_else(|| GemError::Definition("cannot compile a field without a key".into()))?
            .to_string();
        let enumerable = !field.flags().private;
        Ok(Self {
            key,
            field,
            enumerable,
            configurable: true,
        })
    }

    /// Field key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying field spec
    pub fn field(&self) -> &Rc<FieldSpec> {
        &self.field
    }

    /// Check if the field shows up in enumeration
    pub fn is_enumerable(&self) -> bool {
        self.enumerable
    }

    /// Check if the accessor may be redefined by descendants
    pub fn is_configurable(&self) -> bool {
        self.configurable
    }

    /// Read the field
    ///
    /// The cached slot wins; otherwise the default value, otherwise the
    /// getter. Null getter results are not cached so the getter runs again
    /// on the next read.
    pub fn get(&self, gem: &Gem, target: &Instance) -> GemResult<Value> {
        if let Some(cached) = target.slot(&self.key) {
            return Ok(cached);
        }
        let ty = self.field.resolve(gem)?;
        let value = match self.field.default_value() {
            Some(default) => default.clone(),
            None => self.field.read(
                gem,
                &FieldContext {
                    target,
                    key: &self.key,
                    ty,
                },
            )?,
        };
        if !value.is_nullish() {
            target.store_slot(&self.key, value.clone());
        }
        Ok(value)
    }

    /// Write the field
    ///
    /// Returns the value now held by the field. Writing a value equal to the
    /// current one stores nothing and schedules nothing.
    pub fn set(&self, gem: &Gem, target: &Instance, to: Value) -> GemResult<Value> {
        if self.field.is_read_only() {
            return Err(GemError::ReadOnly {
                owner: target.type_name().to_string(),
                key: self.key.clone(),
            });
        }
        let ty = self.field.resolve(gem)?;
        let to = self.admit(gem, target, ty, to)?;
        let from = self.get(gem, target)?;
        if from.same(&to) {
            return Ok(from);
        }

        let stored = self.field.write(
            gem,
            &SetContext {
                target,
                key: &self.key,
                ty,
                to: &to,
                from: &from,
            },
        )?;
        target.store_slot(&self.key, stored.clone());

        if self.field.has_listeners() {
            log::trace!("scheduling change of {}.{}", target.type_name(), self.key);
            gem.notifications().schedule(Notification::new(
                self.field.clone(),
                Change {
                    target: target.clone(),
                    key: self.key.clone(),
                    ty,
                    from,
                    to,
                },
            ));
        }
        Ok(stored)
    }

    fn admit(&self, gem: &Gem, target: &Instance, ty: TypeId, to: Value) -> GemResult<Value> {
        if to.is_null() && self.field.flags().nullable {
            return Ok(to);
        }
        if let Value::Text(text) = &to {
            if !gem.is_text_compatible(ty) {
                let parsed = gem
                    .parse(ty, text)
                    .map_err(|cause| self.rejection(gem, target, ty, &to, Some(cause)))?;
                return if gem.defines(ty, &parsed) {
                    Ok(parsed)
                } else {
                    Err(self.rejection(gem, target, ty, &parsed, None))
                };
            }
        }
        if gem.defines(ty, &to) {
            Ok(to)
        } else {
            Err(self.rejection(gem, target, ty, &to, None))
        }
    }

    fn rejection(
        &self,
        gem: &Gem,
        target: &Instance,
        ty: TypeId,
        value: &Value,
        cause: Option<GemError>,
    ) -> GemError {
        GemError::Assignment {
            owner: target.type_name().to_string(),
            key: self.key.clone(),
            expected: gem.type_name(ty),
            modifier: self.field.flags().modifier(),
            value: value.describe(),
            received: gem.type_name_of(value),
            cause: cause.map(Box::new),
        }
    }
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("key", &self.key)
            .field("enumerable", &self.enumerable)
            .field("configurable", &self.configurable)
            .finish()
    }
}
