//! JSON interchange for record-like values
//!
//! Used by the Record, List, Set and Map primitives' `parse`/`stringify`.
//! Big integers travel as digit strings, timestamps as RFC 3339 text, and
//! instances as objects of their enumerable fields.

use crate::runtime::Gem;
use crate::value::Value;
use crate::{GemError, GemResult};
use chrono::SecondsFormat;
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

/// Maximum nesting depth (shared containers may contain themselves)
const MAX_DEPTH: usize = 100;

/// Convert a runtime value into JSON
pub fn to_json(gem: &Gem, value: &Value) -> GemResult<JsonValue> {
    convert(gem, value, 0)
}

fn convert(gem: &Gem, value: &Value, depth: usize) -> GemResult<JsonValue> {
    if depth > MAX_DEPTH {
        return Err(GemError::Parse {
            type_name: "JSON".to_string(),
            input: value.describe(),
            reason: format!("nesting exceeds {} levels", MAX_DEPTH),
        });
    }
    let next = depth + 1;
    Ok(match value {
        Value::Undefined | Value::Null | Value::Callable(_) => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => JsonNumber::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::BigInt(n) => JsonValue::String(n.to_string()),
        Value::Text(s) => JsonValue::String(s.to_string()),
        Value::Timestamp(t) => JsonValue::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::List(items) | Value::Set(items) => {
            let items = items.borrow().clone();
            JsonValue::Array(
                items
                    .iter()
                    .map(|item| convert(gem, item, next))
                    .collect::<GemResult<_>>()?,
            )
        }
        Value::Map(entries) => {
            let entries = entries.borrow().clone();
            let mut pairs = Vec::with_capacity(entries.len());
            for (k, v) in &entries {
                pairs.push(JsonValue::Array(vec![
                    convert(gem, k, next)?,
                    convert(gem, v, next)?,
                ]));
            }
            JsonValue::Array(pairs)
        }
        Value::Record(record) => {
            let entries: Vec<(String, Value)> = record
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let mut object = JsonMap::new();
            for (k, v) in &entries {
                object.insert(k.clone(), convert(gem, v, next)?);
            }
            JsonValue::Object(object)
        }
        Value::Instance(instance) => {
            let mut object = JsonMap::new();
            for (k, v) in instance.entries(gem)? {
                object.insert(k, convert(gem, &v, next)?);
            }
            JsonValue::Object(object)
        }
        Value::Type(id) => JsonValue::String(gem.type_name(*id)),
    })
}

/// Convert JSON into a runtime value
///
/// Objects become records and arrays become lists.
pub fn from_json(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Value::text(s),
        JsonValue::Array(items) => Value::list(items.iter().map(from_json)),
        JsonValue::Object(object) => {
            Value::record(object.iter().map(|(k, v)| (k.clone(), from_json(v))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_nested() {
        let json: JsonValue = serde_json::from_str(r#"{"a": [1, "x", null], "b": true}"#).unwrap();
        let value = from_json(&json);
        assert_eq!(
            value.record_get("a"),
            Some(Value::list([Value::from(1), Value::from("x"), Value::Null]))
        );
        assert_eq!(value.record_get("b"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_to_json_scalars() {
        let gem = Gem::new().unwrap();
        assert_eq!(to_json(&gem, &Value::from(1.5)).unwrap(), serde_json::json!(1.5));
        assert_eq!(to_json(&gem, &Value::bigint(12)).unwrap(), serde_json::json!("12"));
        assert_eq!(to_json(&gem, &Value::from(f64::NAN)).unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_to_json_rejects_self_containing_lists() {
        let gem = Gem::new().unwrap();
        let list = Value::list(Vec::<Value>::new());
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert!(to_json(&gem, &list).is_err());
    }
}
