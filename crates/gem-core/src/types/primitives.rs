//! Primitive type table
//!
//! The table seeds the built-in value types at bootstrap. Each entry carries
//! its validation expression and its text/storage conversions; refinements
//! (Int, UInt) hang off another primitive's native chain.

use crate::json::{from_json, to_json};
use crate::runtime::Gem;
use crate::value::{format_number, Value};
use crate::{GemError, GemResult};
use chrono::{DateTime, SecondsFormat, Utc};
use num_bigint::BigInt;
use std::fmt;

/// Built-in value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Text
    Text,
    /// IEEE-754 double
    Number,
    /// true/false
    Boolean,
    /// Arbitrary precision integer
    BigInt,
    /// Native function
    Callable,
    /// Plain record; the universal base type
    Record,
    /// Ordered list
    List,
    /// UTC instant
    Timestamp,
    /// Set of distinct values
    Set,
    /// Key/value map
    Map,
}

impl PrimitiveKind {
    /// Every kind a primitive table must provide
    pub const ALL: [PrimitiveKind; 10] = [
        PrimitiveKind::Text,
        PrimitiveKind::Number,
        PrimitiveKind::Boolean,
        PrimitiveKind::BigInt,
        PrimitiveKind::Callable,
        PrimitiveKind::Record,
        PrimitiveKind::List,
        PrimitiveKind::Timestamp,
        PrimitiveKind::Set,
        PrimitiveKind::Map,
    ];

    /// Check if a value is stored as this kind
    pub fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (PrimitiveKind::Text, Value::Text(_))
                | (PrimitiveKind::Number, Value::Number(_))
                | (PrimitiveKind::Boolean, Value::Bool(_))
                | (PrimitiveKind::BigInt, Value::BigInt(_))
                | (PrimitiveKind::Callable, Value::Callable(_))
                | (PrimitiveKind::Record, Value::Record(_))
                | (PrimitiveKind::List, Value::List(_))
                | (PrimitiveKind::Timestamp, Value::Timestamp(_))
                | (PrimitiveKind::Set, Value::Set(_))
                | (PrimitiveKind::Map, Value::Map(_))
        )
    }

    /// Value produced by constructing the kind without arguments
    pub fn zero(self) -> Value {
        match self {
            PrimitiveKind::Text => Value::text(""),
            PrimitiveKind::Number => Value::Number(0.0),
            PrimitiveKind::Boolean => Value::Bool(false),
            PrimitiveKind::BigInt => Value::bigint(0),
            PrimitiveKind::Callable => Value::callable("", |_, _| Ok(Value::Undefined)),
            PrimitiveKind::Record => Value::record(Vec::<(String, Value)>::new()),
            PrimitiveKind::List => Value::list(Vec::<Value>::new()),
            PrimitiveKind::Timestamp => Value::Timestamp(Utc::now()),
            PrimitiveKind::Set => Value::set(Vec::<Value>::new()),
            PrimitiveKind::Map => Value::map(Vec::<(Value, Value)>::new()),
        }
    }
}

/// One primitive type
#[derive(Clone)]
pub struct PrimitiveSpec {
    /// Registered type name
    pub name: String,
    /// Storage kind
    pub kind: PrimitiveKind,
    /// Validation expression; `.*` when absent
    pub expression: Option<String>,
    /// Text → value; the error is the reason
    pub parse: fn(&str) -> Result<Value, String>,
    /// Value → text; `Gem::render` when absent
    pub stringify: Option<fn(&Gem, &Value) -> GemResult<String>>,
    /// Value → storable value; identity when absent
    pub serialise: Option<fn(&Value) -> Value>,
    /// Refined type test; nominal when absent
    pub refine: Option<fn(&Value) -> bool>,
    /// Native parent, by name
    pub extends: Option<String>,
}

impl PrimitiveSpec {
    /// A primitive with the given parse function and no overrides
    pub fn new(name: &str, kind: PrimitiveKind, parse: fn(&str) -> Result<Value, String>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            expression: None,
            parse,
            stringify: None,
            serialise: None,
            refine: None,
            extends: None,
        }
    }

    /// Set the validation expression
    pub fn expression(mut self, pattern: &str) -> Self {
        self.expression = Some(pattern.to_string());
        self
    }

    /// Set the stringify conversion
    pub fn stringify(mut self, f: fn(&Gem, &Value) -> GemResult<String>) -> Self {
        self.stringify = Some(f);
        self
    }

    /// Set the serialise conversion
    pub fn serialise(mut self, f: fn(&Value) -> Value) -> Self {
        self.serialise = Some(f);
        self
    }

    /// Refine the type test with a predicate
    pub fn refine(mut self, f: fn(&Value) -> bool) -> Self {
        self.refine = Some(f);
        self
    }

    /// Hang the primitive off another primitive's native chain
    pub fn extends(mut self, parent: &str) -> Self {
        self.extends = Some(parent.to_string());
        self
    }
}

impl fmt::Debug for PrimitiveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("expression", &self.expression)
            .field("extends", &self.extends)
            .finish()
    }
}

/// Replaceable table of primitives
#[derive(Debug, Clone)]
pub struct PrimitiveTable {
    specs: Vec<PrimitiveSpec>,
}

impl PrimitiveTable {
    /// Empty table
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Append a primitive (later entries may extend earlier ones)
    pub fn with(mut self, spec: PrimitiveSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Remove a primitive by name
    pub fn without(mut self, name: &str) -> Self {
        self.specs.retain(|s| s.name != name);
        self
    }

    /// Entries in registration order
    pub fn specs(&self) -> &[PrimitiveSpec] {
        &self.specs
    }

    /// The standard primitives
    pub fn standard() -> Self {
        Self::empty()
            .with(
                PrimitiveSpec::new("Record", PrimitiveKind::Record, parse_record)
                    .stringify(stringify_json)
                    .refine(|v| matches!(v, Value::Record(_) | Value::Instance(_))),
            )
            .with(PrimitiveSpec::new("Text", PrimitiveKind::Text, parse_text).stringify(stringify_text))
            .with(
                PrimitiveSpec::new("Number", PrimitiveKind::Number, parse_number)
                    .expression(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?$")
                    .stringify(stringify_number),
            )
            .with(
                PrimitiveSpec::new("Int", PrimitiveKind::Number, parse_int)
                    .expression(r"^[+-]?[0-9]+$")
                    .stringify(stringify_number)
                    .refine(is_int)
                    .extends("Number"),
            )
            .with(
                PrimitiveSpec::new("UInt", PrimitiveKind::Number, parse_uint)
                    .expression(r"^\+?[0-9]+$")
                    .stringify(stringify_number)
                    .refine(is_uint)
                    .extends("Int"),
            )
            .with(
                PrimitiveSpec::new("Boolean", PrimitiveKind::Boolean, parse_boolean)
                    .expression(r"^(?i:true|false)$"),
            )
            .with(
                PrimitiveSpec::new("BigInt", PrimitiveKind::BigInt, parse_bigint)
                    .expression(r"^-?[0-9]+n$")
                    .stringify(stringify_bigint),
            )
            .with(PrimitiveSpec::new("Callable", PrimitiveKind::Callable, parse_callable))
            .with(
                PrimitiveSpec::new("List", PrimitiveKind::List, parse_list)
                    .stringify(stringify_json),
            )
            .with(
                PrimitiveSpec::new("Timestamp", PrimitiveKind::Timestamp, parse_timestamp)
                    .expression(
                        r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}(:[0-9]{2}(\.[0-9]+)?)?(Z|[+-][0-9]{2}:[0-9]{2})$",
                    )
                    .stringify(stringify_timestamp)
                    .serialise(serialise_timestamp),
            )
            .with(
                PrimitiveSpec::new("Set", PrimitiveKind::Set, parse_set)
                    .stringify(stringify_json)
                    .serialise(serialise_set),
            )
            .with(
                PrimitiveSpec::new("Map", PrimitiveKind::Map, parse_map)
                    .stringify(stringify_json)
                    .serialise(serialise_map),
            )
    }
}

impl Default for PrimitiveTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn parse_text(s: &str) -> Result<Value, String> {
    Ok(Value::text(s))
}

fn stringify_text(_gem: &Gem, value: &Value) -> GemResult<String> {
    Ok(match value {
        Value::Text(s) => s.to_string(),
        other => other.to_string(),
    })
}

fn parse_number(s: &str) -> Result<Value, String> {
    let n: f64 = s.trim().parse().map_err(|_| "not a number".to_string())?;
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err("not a finite number".to_string())
    }
}

fn stringify_number(_gem: &Gem, value: &Value) -> GemResult<String> {
    match value {
        Value::Number(n) => Ok(format_number(*n)),
        other => Ok(other.to_string()),
    }
}

fn is_int(value: &Value) -> bool {
    value
        .as_number()
        .is_some_and(|n| n.is_finite() && n.fract() == 0.0)
}

fn is_uint(value: &Value) -> bool {
    is_int(value) && value.as_number().is_some_and(|n| n >= 0.0)
}

fn parse_int(s: &str) -> Result<Value, String> {
    let value = parse_number(s)?;
    if is_int(&value) {
        Ok(value)
    } else {
        Err("not an integer".to_string())
    }
}

fn parse_uint(s: &str) -> Result<Value, String> {
    let value = parse_int(s)?;
    if is_uint(&value) {
        Ok(value)
    } else {
        Err("negative".to_string())
    }
}

fn parse_boolean(s: &str) -> Result<Value, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Ok(Value::Bool(true))
    } else if s.eq_ignore_ascii_case("false") {
        Ok(Value::Bool(false))
    } else {
        Err("expected true or false".to_string())
    }
}

fn parse_bigint(s: &str) -> Result<Value, String> {
    let s = s.trim();
    let digits = s.strip_suffix('n').unwrap_or(s);
    digits
        .parse::<BigInt>()
        .map(Value::bigint)
        .map_err(|e| e.to_string())
}

fn stringify_bigint(_gem: &Gem, value: &Value) -> GemResult<String> {
    match value {
        Value::BigInt(n) => Ok(format!("{}n", n)),
        other => Ok(other.to_string()),
    }
}

fn parse_callable(_s: &str) -> Result<Value, String> {
    Err("functions cannot be built from text".to_string())
}

fn parse_json(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| e.to_string())
}

fn parse_record(s: &str) -> Result<Value, String> {
    match parse_json(s)? {
        json @ serde_json::Value::Object(_) => Ok(from_json(&json)),
        _ => Err("expected a JSON object".to_string()),
    }
}

fn parse_list(s: &str) -> Result<Value, String> {
    match parse_json(s)? {
        json @ serde_json::Value::Array(_) => Ok(from_json(&json)),
        _ => Err("expected a JSON array".to_string()),
    }
}

fn parse_set(s: &str) -> Result<Value, String> {
    match parse_json(s)? {
        serde_json::Value::Array(items) => Ok(Value::set(items.iter().map(from_json))),
        _ => Err("expected a JSON array".to_string()),
    }
}

fn parse_map(s: &str) -> Result<Value, String> {
    let items = match parse_json(s)? {
        serde_json::Value::Array(items) => items,
        _ => return Err("expected a JSON array of pairs".to_string()),
    };
    let mut pairs = Vec::with_capacity(items.len());
    for item in &items {
        match item {
            serde_json::Value::Array(pair) if pair.len() == 2 => {
                pairs.push((from_json(&pair[0]), from_json(&pair[1])));
            }
            _ => return Err("expected a [key, value] pair".to_string()),
        }
    }
    Ok(Value::map(pairs))
}

fn stringify_json(gem: &Gem, value: &Value) -> GemResult<String> {
    let json = to_json(gem, value)?;
    serde_json::to_string(&json).map_err(|e| GemError::Config(e.to_string()))
}

fn parse_timestamp(s: &str) -> Result<Value, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
        .map_err(|e| e.to_string())
}

fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn stringify_timestamp(_gem: &Gem, value: &Value) -> GemResult<String> {
    match value {
        Value::Timestamp(t) => Ok(format_timestamp(t)),
        other => Ok(other.to_string()),
    }
}

fn serialise_timestamp(value: &Value) -> Value {
    match value {
        Value::Timestamp(t) => Value::text(format_timestamp(t)),
        other => other.clone(),
    }
}

fn serialise_set(value: &Value) -> Value {
    match value {
        Value::Set(items) => Value::list(items.borrow().iter().cloned()),
        other => other.clone(),
    }
}

fn serialise_map(value: &Value) -> Value {
    match value {
        Value::Map(entries) => Value::list(
            entries
                .borrow()
                .iter()
                .map(|(k, v)| Value::list([k.clone(), v.clone()])),
        ),
        other => other.clone(),
    }
}
