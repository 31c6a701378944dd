//! Conversion between runtime values and JSON
//!
//! Used by `FormatJson`/`ParseJson`, by the host state snapshot and for
//! field defaults declared by node types.

use serde_json::{Map, Number};

use super::Value;
use crate::component::{array, assoc_array, ComponentKind};
use crate::error::EvalError;

const MAX_DEPTH: usize = 256;

/// Convert a value to JSON. Functions cannot be represented; nested
/// containers deeper than an internal limit (usually a cycle) are rejected.
pub fn to_json(value: &Value) -> Result<serde_json::Value, EvalError> {
    to_json_at(value, 0)
}

fn to_json_at(value: &Value, depth: usize) -> Result<serde_json::Value, EvalError> {
    if depth > MAX_DEPTH {
        return Err(EvalError::type_mismatch("Nested object reference too deep for JSON"));
    }
    let json = match value {
        Value::Invalid => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Int32(n) => serde_json::Value::Number((*n).into()),
        Value::Int64(n) => serde_json::Value::Number((*n).into()),
        Value::Float(n) => float(*n as f64),
        Value::Double(n) => float(*n),
        Value::Function(f) => {
            return Err(EvalError::type_mismatch(format!(
                "Value of type Function ({}) cannot be converted to JSON",
                f.name()
            )))
        }
        Value::Object(obj) => {
            let component = obj
                .try_borrow()
                .map_err(|_| EvalError::internal("Object is busy and cannot be converted to JSON"))?;
            match &component.kind {
                ComponentKind::AssocArray(aa) => {
                    let mut map = Map::new();
                    for (key, v) in aa.entries() {
                        map.insert(key.to_string(), to_json_at(v, depth + 1)?);
                    }
                    serde_json::Value::Object(map)
                }
                ComponentKind::Array(items) => serde_json::Value::Array(
                    items
                        .elements()
                        .iter()
                        .map(|v| to_json_at(v, depth + 1))
                        .collect::<Result<_, _>>()?,
                ),
                ComponentKind::Boxed(inner) => to_json_at(inner, depth + 1)?,
                ComponentKind::Node(node) => {
                    let mut map = Map::new();
                    for (name, field) in node.fields() {
                        if let Ok(json) = to_json_at(field.value(), depth + 1) {
                            map.insert(name.to_string(), json);
                        }
                    }
                    serde_json::Value::Object(map)
                }
            }
        }
    };
    Ok(json)
}

fn float(n: f64) -> serde_json::Value {
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Convert parsed JSON into runtime values: objects become associative
/// arrays, arrays become `roArray`, integers pick the narrowest integer
/// kind and other numbers become `Float`.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Invalid,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => match i32::try_from(i) {
                Ok(small) => Value::Int32(small),
                Err(_) => Value::Int64(i),
            },
            None => Value::Float(n.as_f64().unwrap_or(0.0) as f32),
        },
        serde_json::Value::Array(items) => array::new_value(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            assoc_array::new_value(map.iter().map(|(k, v)| (k.clone(), from_json(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_structure_survives_conversion() {
        let source = json!({"name": "brisk", "tags": ["a", "b"], "count": 3, "ratio": 0.5, "none": null});
        let value = from_json(&source);
        assert_eq!(to_json(&value).unwrap(), source);
    }

    #[test]
    fn test_large_integers_become_long() {
        assert_eq!(from_json(&json!(5_000_000_000i64)), Value::Int64(5_000_000_000));
        assert_eq!(from_json(&json!(7)), Value::Int32(7));
        assert_eq!(from_json(&json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let aa = assoc_array::new_value(Vec::new());
        if let Value::Object(obj) = &aa {
            assoc_array::insert(obj, "me", aa.clone());
        }
        assert!(to_json(&aa).is_err());
    }
}
