//! Value representation for the GEM runtime
//!
//! Primitives are stored inline; lists, sets, maps and records are shared
//! behind `Rc<RefCell<..>>` so that assignment keeps reference semantics.

use crate::object::Instance;
use crate::runtime::Gem;
use crate::types::TypeId;
use crate::GemResult;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Native function signature for callable values
pub type NativeFn = Rc<dyn Fn(&Gem, &[Value]) -> GemResult<Value>>;

/// A named native function
#[derive(Clone)]
pub struct Callable {
    name: Rc<str>,
    func: NativeFn,
}

impl Callable {
    /// Wrap a closure as a callable value
    pub fn new<F>(name: impl Into<Rc<str>>, func: F) -> Self
    where
        F: Fn(&Gem, &[Value]) -> GemResult<Value> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// Function name (may be empty)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function
    pub fn call(&self, gem: &Gem, args: &[Value]) -> GemResult<Value> {
        (self.func)(gem, args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

/// Shared ordered record storage
pub type RecordCell = Rc<RefCell<IndexMap<String, Value>>>;

/// Runtime value
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// IEEE-754 double
    Number(f64),
    /// Arbitrary precision integer
    BigInt(Rc<BigInt>),
    /// Immutable text
    Text(Rc<str>),
    /// UTC instant
    Timestamp(DateTime<Utc>),
    /// Ordered list
    List(Rc<RefCell<Vec<Value>>>),
    /// Insertion-ordered set of distinct values
    Set(Rc<RefCell<Vec<Value>>>),
    /// Insertion-ordered key/value pairs with arbitrary keys
    Map(Rc<RefCell<Vec<(Value, Value)>>>),
    /// Plain record (string keys)
    Record(RecordCell),
    /// Native function
    Callable(Callable),
    /// Instance of a composed type
    Instance(Instance),
    /// Type handle
    Type(TypeId),
}

impl Value {
    /// Create a text value
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(Rc::from(s.as_ref()))
    }

    /// Create a big integer value
    pub fn bigint(n: impl Into<BigInt>) -> Self {
        Value::BigInt(Rc::new(n.into()))
    }

    /// Create a list value
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(Rc::new(RefCell::new(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    /// Create a set value; duplicates (by assignment equality) are dropped
    pub fn set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut members: Vec<Value> = Vec::new();
        for item in items {
            let item = item.into();
            if !members.iter().any(|m| m.same(&item)) {
                members.push(item);
            }
        }
        Value::Set(Rc::new(RefCell::new(members)))
    }

    /// Create a map value; later pairs replace earlier pairs with the same key
    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        let mut entries: Vec<(Value, Value)> = Vec::new();
        for (k, v) in pairs {
            let (k, v) = (k.into(), v.into());
            match entries.iter_mut().find(|(existing, _)| existing.same(&k)) {
                Some(slot) => slot.1 = v,
                None => entries.push((k, v)),
            }
        }
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// Create a record value
    pub fn record<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Record(Rc::new(RefCell::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }

    /// Create a callable value
    pub fn callable<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Gem, &[Value]) -> GemResult<Value> + 'static,
    {
        Value::Callable(Callable::new(name, func))
    }

    /// Check for undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check for null or undefined
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Literal values infer their field type and become defaults
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Value::Undefined
                | Value::Null
                | Value::Bool(_)
                | Value::Number(_)
                | Value::BigInt(_)
                | Value::Text(_)
        )
    }

    /// Check for callable
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Callable(_))
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as big integer
    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            Value::BigInt(n) => Some(n),
            _ => None,
        }
    }

    /// Get as instance
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Get as type handle
    pub fn as_type(&self) -> Option<TypeId> {
        match self {
            Value::Type(id) => Some(*id),
            _ => None,
        }
    }

    /// Read a key from a record value
    pub fn record_get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Record(r) => r.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Snapshot of list elements
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Value::List(items) | Value::Set(items) => Some(Rc::as_ptr(items) as *const () as usize),
            Value::Map(entries) => Some(Rc::as_ptr(entries) as *const () as usize),
            Value::Record(record) => Some(Rc::as_ptr(record) as *const () as usize),
            Value::Instance(instance) => Some(instance.addr()),
            _ => None,
        }
    }

        pub fn list_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }

    /// Coarse kind name used when no type can be attributed
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::Text(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Callable(_) => "function",
            Value::Instance(_) => "instance",
            Value::Type(_) => "type",
        }
    }

    /// Assignment equality
    ///
    /// Primitives compare by value (timestamps by instant); shared
    /// containers, instances and callables compare by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }

    /// Short rendering for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Value::Text(s) => format!("{:?}", s.as_ref()),
            Value::List(items) => format!("[list of {}]", items.borrow().len()),
            Value::Set(items) => format!("[set of {}]", items.borrow().len()),
            Value::Map(entries) => format!("[map of {}]", entries.borrow().len()),
            Value::Record(r) => format!("[record of {}]", r.borrow().len()),
            other => other.to_string(),
        }
    }
}

/// Structural equality (deep for containers)
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) | (Value::Set(a), Value::Set(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Record(a), Value::Record(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.same(other),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Value {
    /// Display with the containers currently being written in `path`
    fn fmt_on_path(&self, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
        let addr = match self {
            Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Record(_) => self.identity(),
            _ => None,
        };
        if let Some(addr) = addr {
            if path.contains(&addr) {
                return write!(f, "[Circular]");
            }
            path.push(addr);
        }
        let result = self.fmt_shallow(f, path);
        if addr.is_some() {
            path.pop();
        }
        result
    }

    fn fmt_shallow(&self, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::BigInt(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::List(items) | Value::Set(items) => {
                let items = items.borrow();
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_on_path(f, path)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                let entries = entries.borrow();
                write!(f, "Map(")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    k.fmt_on_path(f, path)?;
                    write!(f, " => ")?;
                    v.fmt_on_path(f, path)?;
                }
                write!(f, ")")
            }
            Value::Record(r) => {
                let r = r.borrow();
                write!(f, "{{")?;
                for (i, (k, v)) in r.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: ", k)?;
                    v.fmt_on_path(f, path)?;
                }
                if r.is_empty() {
                    write!(f, "}}")
                } else {
                    write!(f, " }}")
                }
            }
            Value::Callable(c) => write!(f, "[function {}]", c.name()),
            Value::Instance(i) => write!(f, "{}#{}", i.type_name(), i.id()),
            Value::Type(id) => write!(f, "{}", id),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_on_path(f, &mut Vec::new())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(Rc::from(s))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(Rc::new(n))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Value::Instance(i)
    }
}

impl From<TypeId> for Value {
    fn from(id: TypeId) -> Self {
        Value::Type(id)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_classification() {
        assert!(Value::Null.is_literal());
        assert!(Value::from(3.0).is_literal());
        assert!(Value::from("x").is_literal());
        assert!(Value::bigint(7).is_literal());
        assert!(!Value::list(Vec::<Value>::new()).is_literal());
        assert!(!Value::record(Vec::<(String, Value)>::new()).is_literal());
    }

    #[test]
    fn test_same_compares_primitives_by_value() {
        assert!(Value::from("abc").same(&Value::from("abc")));
        assert!(Value::from(1.5).same(&Value::from(1.5)));
        assert!(Value::from(f64::NAN).same(&Value::from(f64::NAN)));
        assert!(Value::bigint(10).same(&Value::bigint(10)));
        assert!(!Value::Null.same(&Value::Undefined));
    }

    #[test]
    fn test_same_compares_containers_by_identity() {
        let a = Value::list([1, 2]);
        let b = Value::list([1, 2]);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_drops_duplicates() {
        let s = Value::set([1, 2, 1, 3]);
        assert_eq!(s.list_items().map(|v| v.len()), Some(3));
    }

    #[test]
    fn test_map_replaces_existing_keys() {
        let m = Value::map([("a", 1), ("b", 2), ("a", 3)]);
        match m {
            Value::Map(entries) => {
                let entries = entries.borrow();
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].1, Value::from(3));
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Value::from(3.0).to_string(), "3");
        assert_eq!(Value::from(3.145).to_string(), "3.145");
        assert_eq!(Value::from(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::from(-0.5).to_string(), "-0.5");
    }

    #[test]
    fn test_record_display() {
        let r = Value::record([("name", Value::from("Ann")), ("age", Value::from(3))]);
        assert_eq!(r.to_string(), "{ name: Ann, age: 3 }");
        assert_eq!(r.describe(), "[record of 2]");
    }

    #[test]
    fn test_display_marks_cyclic_containers() {
        let list = Value::list([1]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.to_string(), "[1, [Circular]]");

        let record = Value::record([("id", 1)]);
        if let Value::Record(entries) = &record {
            entries.borrow_mut().insert("me".to_string(), record.clone());
        }
        assert_eq!(record.to_string(), "{ id: 1, me: [Circular] }");

        let shared = Value::list([2]);
        let twice = Value::list([shared.clone(), shared]);
        assert_eq!(twice.to_string(), "[[2], [2]]");
    }
}
