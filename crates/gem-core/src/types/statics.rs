//! Statics shared by every type
//!
//! Every descriptor carries the same static surface: `validate`, `parse`,
//! `stringify`, `serialise`, `defines` and `has_instance`. Types override
//! the conversions individually; the rest fall back to the defaults on
//! [`Gem`](crate::Gem).

use super::descriptor::{TypeDescriptor, TypeId};
use crate::runtime::Gem;
use crate::value::Value;
use crate::{GemError, GemResult};
use indexmap::IndexMap;
use regex::Regex;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Text → value conversion
pub type ParseFn = Rc<dyn Fn(&Gem, &TypeDescriptor, &str) -> GemResult<Value>>;
/// Value → text conversion
pub type StringifyFn = Rc<dyn Fn(&Gem, &TypeDescriptor, &Value) -> GemResult<String>>;
/// Value → storable value conversion
pub type SerialiseFn = Rc<dyn Fn(&Gem, &TypeDescriptor, &Value) -> GemResult<Value>>;
/// Refinement predicate
pub type PredicateFn = Rc<dyn Fn(&Value) -> bool>;

/// How a type decides whether it defines a value
#[derive(Clone)]
pub enum TypeTest {
    /// The value's type is the type or descends from it
    Nominal,
    /// Every required field is present and satisfies its declared type
    Structural,
    /// A predicate over the value
    Refined(PredicateFn),
}

impl fmt::Debug for TypeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTest::Nominal => write!(f, "Nominal"),
            TypeTest::Structural => write!(f, "Structural"),
            TypeTest::Refined(_) => write!(f, "Refined(..)"),
        }
    }
}

/// Static surface of a type
#[derive(Clone)]
pub struct Statics {
    pub(crate) expression: Option<Regex>,
    pub(crate) parse: Option<ParseFn>,
    pub(crate) stringify: Option<StringifyFn>,
    pub(crate) serialise: Option<SerialiseFn>,
    pub(crate) test: TypeTest,
    pub(crate) extra: Rc<RefCell<IndexMap<String, Value>>>,
}

impl Statics {
    /// Defaults: match-all expression, nominal test, no overrides
    pub fn new() -> Self {
        Self {
            expression: None,
            parse: None,
            stringify: None,
            serialise: None,
            test: TypeTest::Nominal,
            extra: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    /// Set the validation expression
    pub fn with_expression(mut self, pattern: &str) -> GemResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| GemError::Config(format!("invalid expression {:?}: {}", pattern, e)))?;
        self.expression = Some(regex);
        Ok(self)
    }

    /// Set the type test
    pub fn with_test(mut self, test: TypeTest) -> Self {
        self.test = test;
        self
    }

    /// Validation expression source (`.*` when unset)
    pub fn expression(&self) -> &str {
        self.expression.as_ref().map(Regex::as_str).unwrap_or(".*")
    }

    /// Type test in effect
    pub fn test(&self) -> &TypeTest {
        &self.test
    }

    /// Check text against the expression
    pub fn validate(&self, text: &str) -> bool {
        match &self.expression {
            Some(regex) => regex.is_match(text),
            None => true,
        }
    }

    /// Extra static attached with `attach_statics`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.extra.borrow().get(key).cloned()
    }

    pub(crate) fn attach(&self, key: String, value: Value) {
        self.extra.borrow_mut().insert(key, value);
    }
}

impl Default for Statics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Statics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statics")
            .field("expression", &self.expression())
            .field("test", &self.test)
            .field("parse", &self.parse.is_some())
            .field("stringify", &self.stringify.is_some())
            .field("serialise", &self.serialise.is_some())
            .finish()
    }
}

impl Gem {
    /// Check text against a type's validation expression
    pub fn validate(&self, ty: TypeId, text: &str) -> GemResult<bool> {
        Ok(self.descriptor(ty)?.statics.validate(text))
    }

    /// Convert text into a value of `ty`
    ///
    /// Without an override the type is constructed from the text.
    pub fn parse(&self, ty: TypeId, text: &str) -> GemResult<Value> {
        let desc = self.descriptor(ty)?;
        match desc.statics.parse.clone() {
            Some(parse) => parse(self, desc.as_ref(), text),
            None => self.construct(ty, &[Value::text(text)]),
        }
    }

    /// Render a value of `ty` as text
    pub fn stringify(&self, ty: TypeId, value: &Value) -> GemResult<String> {
        let desc = self.descriptor(ty)?;
        match desc.statics.stringify.clone() {
            Some(stringify) => stringify(self, desc.as_ref(), value),
            None => self.render(value),
        }
    }

    /// Convert a value of `ty` into its storable form (identity by default)
    pub fn serialise(&self, ty: TypeId, value: &Value) -> GemResult<Value> {
        let desc = self.descriptor(ty)?;
        match desc.statics.serialise.clone() {
            Some(serialise) => serialise(self, desc.as_ref(), value),
            None => Ok(value.clone()),
        }
    }

    /// Attach extra fixed statics to a type
    pub fn attach_statics<I, K>(&self, ty: TypeId, props: I) -> GemResult<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let desc = self.descriptor(ty)?;
        for (key, value) in props {
            desc.statics.attach(key.into(), value);
        }
        Ok(())
    }

    /// Read an extra static
    pub fn static_value(&self, ty: TypeId, key: &str) -> GemResult<Option<Value>> {
        Ok(self.descriptor(ty)?.statics.get(key))
    }

    /// Check if `ty` defines `value`, using the type's test
    pub fn defines(&self, ty: TypeId, value: &Value) -> bool {
        let desc = match self.descriptor(ty) {
            Ok(desc) => desc,
            Err(_) => return false,
        };
        match &desc.statics.test {
            TypeTest::Nominal => match self.type_of(value) {
                Some(actual) => self.is_same_or_ancestor(actual, ty),
                None => false,
            },
            TypeTest::Structural => self.satisfies_structure(&desc, value),
            TypeTest::Refined(predicate) => predicate(value),
        }
    }

    /// Instance test: text is validated, anything else goes to `defines`
    pub fn has_instance(&self, ty: TypeId, value: &Value) -> bool {
        match value {
            Value::Text(text) => self.validate(ty, text).unwrap_or(false),
            other => self.defines(ty, other),
        }
    }

    /// A (type, value) pair met again while it is being checked is assumed
    /// to hold, so self-typed interfaces terminate on cyclic values.
    fn satisfies_structure(&self, desc: &TypeDescriptor, value: &Value) -> bool {
        let visit = value.identity().map(|addr| (desc.id(), addr));
        if let Some(visit) = visit {
            if !self.structural_path.borrow_mut().insert(visit) {
                return true;
            }
        }
        let result = self.check_structure(desc, value);
        if let Some(visit) = visit {
            self.structural_path.borrow_mut().remove(&visit);
        }
        result
    }

    fn check_structure(&self, desc: &TypeDescriptor, value: &Value) -> bool {
        for (key, field) in desc.prescriptor() {
            if !field.flags().required {
                continue;
            }
            let present = match value {
                Value::Record(_) => value.record_get(key).unwrap_or_default(),
                Value::Instance(instance) => instance.get(self, key).unwrap_or_default(),
                _ => Value::Undefined,
            };
            if present.is_nullish() {
                return false;
            }
            let ty = match field.resolve(self) {
                Ok(ty) => ty,
                Err(_) => return false,
            };
            if !self.has_instance(ty, &present) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_expression_matches_everything() {
        let statics = Statics::new();
        assert_eq!(statics.expression(), ".*");
        assert!(statics.validate(""));
        assert!(statics.validate("anything at all"));
    }

    #[test]
    fn test_expression_validation() {
        let statics = Statics::new().with_expression("^[0-9]+$").unwrap();
        assert!(statics.validate("123"));
        assert!(!statics.validate("12a"));
    }

    #[test]
    fn test_bad_expression_is_config_error() {
        assert!(matches!(
            Statics::new().with_expression("(unclosed"),
            Err(GemError::Config(_))
        ));
    }

    #[test]
    fn test_extra_statics_are_shared_between_clones() {
        let statics = Statics::new();
        let copy = statics.clone();
        statics.attach("version".into(), Value::from(2));
        assert_eq!(copy.get("version"), Some(Value::from(2)));
    }
}
