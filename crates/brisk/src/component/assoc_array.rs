//! `roAssociativeArray`: string-keyed map with case-insensitive keys

use std::collections::BTreeMap;
use std::rc::Rc;

use super::{array, bound_method, method_table, Component, ComponentKind, MethodTable};
use crate::error::EvalError;
use crate::eval::Interpreter;
use crate::value::{Callable, Object, Param, Signature, Value, ValueKind};

pub const NAME: &str = "roAssociativeArray";

/// Element storage. Keys are folded to lowercase unless the array was
/// switched to case-sensitive mode; iteration is in key order.
#[derive(Debug, Clone, Default)]
pub struct AssocArray {
    elements: BTreeMap<String, Value>,
    case_sensitive: bool,
}

impl AssocArray {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&self, key: &str) -> String {
        if self.case_sensitive {
            key.to_string()
        } else {
            key.to_lowercase()
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.elements.get(&self.key(key))
    }

    /// Case-insensitive lookup regardless of mode.
    pub fn get_ci(&self, key: &str) -> Option<&Value> {
        if !self.case_sensitive {
            return self.get(key);
        }
        self.elements
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        let key = self.key(key);
        self.elements.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let key = self.key(key);
        self.elements.remove(&key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.elements.contains_key(&self.key(key))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.elements.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> Vec<String> {
        self.elements.keys().cloned().collect()
    }

    pub fn set_case_sensitive(&mut self) {
        self.case_sensitive = true;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Construction and Member Access
// ═══════════════════════════════════════════════════════════════════════

fn table() -> Rc<MethodTable> {
    method_table(NAME, build_table)
}

pub fn new_object(entries: Vec<(String, Value)>) -> Object {
    let mut aa = AssocArray::new();
    for (key, value) in entries {
        aa.set(&key, value);
    }
    Rc::new(std::cell::RefCell::new(Component::new(
        NAME,
        table(),
        ComponentKind::AssocArray(aa),
    )))
}

pub fn new_value(entries: Vec<(String, Value)>) -> Value {
    Value::Object(new_object(entries))
}

/// Store `value` under `key`. Does nothing if `obj` is not an
/// associative array.
pub fn insert(obj: &Object, key: &str, value: Value) {
    if let Some(aa) = obj.borrow_mut().as_assoc_array_mut() {
        aa.set(key, value);
    }
}

/// Member read: the element if present, else a bound method of that name,
/// else `invalid`.
pub fn get_member(obj: &Object, key: &str) -> Value {
    let element = obj
        .borrow()
        .as_assoc_array()
        .and_then(|aa| aa.get(key).cloned());
    match element {
        Some(value) => value,
        None => bound_method(obj, key).map_or(Value::Invalid, Value::Function),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Methods
// ═══════════════════════════════════════════════════════════════════════

fn build_table() -> MethodTable {
    use ValueKind as K;
    MethodTable::new()
        .interface(
            "ifAssociativeArray",
            vec![
                Callable::method("clear", Signature::new(vec![], K::Void), clear),
                Callable::method("delete", Signature::new(vec![Param::required("key", K::String)], K::Boolean), delete),
                Callable::method(
                    "addReplace",
                    Signature::new(vec![Param::required("key", K::String), Param::required("value", K::Dynamic)], K::Void),
                    add_replace,
                ),
                Callable::method("count", Signature::new(vec![], K::Int32), count),
                Callable::method("doesExist", Signature::new(vec![Param::required("key", K::String)], K::Boolean), does_exist),
                Callable::method("append", Signature::new(vec![Param::required("other", K::Object)], K::Void), append),
                Callable::method("keys", Signature::new(vec![], K::Object), keys),
                Callable::method("items", Signature::new(vec![], K::Object), items),
                Callable::method("lookup", Signature::new(vec![Param::required("key", K::String)], K::Dynamic), lookup),
                Callable::method("lookupCI", Signature::new(vec![Param::required("key", K::String)], K::Dynamic), lookup_ci),
                Callable::method("setModeCaseSensitive", Signature::new(vec![], K::Void), set_mode_case_sensitive),
            ],
        )
        .interface(
            "ifEnum",
            vec![Callable::method("isEmpty", Signature::new(vec![], K::Boolean), is_empty)],
        )
}

fn with_aa<T>(this: &Object, f: impl FnOnce(&mut AssocArray) -> T) -> Result<T, EvalError> {
    let mut component = this.borrow_mut();
    let aa = component
        .as_assoc_array_mut()
        .ok_or_else(|| EvalError::internal("receiver is not an associative array"))?;
    Ok(f(aa))
}

fn key_arg(args: &[Value]) -> &str {
    args.first().and_then(Value::as_str).unwrap_or_default()
}

fn clear(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_aa(this, |aa| aa.clear())?;
    Ok(Value::Invalid)
}

fn delete(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    with_aa(this, |aa| Value::Bool(aa.remove(key_arg(args))))
}

fn add_replace(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let value = args.get(1).cloned().unwrap_or(Value::Invalid);
    with_aa(this, |aa| aa.set(key_arg(args), value))?;
    Ok(Value::Invalid)
}

fn count(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_aa(this, |aa| Value::Int32(aa.len() as i32))
}

fn does_exist(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    with_aa(this, |aa| Value::Bool(aa.contains(key_arg(args))))
}

fn append(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let other = match args.first() {
        Some(Value::Object(obj)) => obj.clone(),
        _ => return Err(EvalError::type_mismatch("append expects an associative array")),
    };
    let entries: Vec<(String, Value)> = match other.borrow().as_assoc_array() {
        Some(aa) => aa.entries().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        None => return Err(EvalError::type_mismatch("append expects an associative array")),
    };
    with_aa(this, |aa| {
        for (key, value) in entries {
            aa.set(&key, value);
        }
    })?;
    Ok(Value::Invalid)
}

fn keys(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    let keys = with_aa(this, |aa| aa.keys())?;
    Ok(array::new_value(keys.into_iter().map(Value::from).collect()))
}

fn items(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    let entries: Vec<(String, Value)> =
        with_aa(this, |aa| aa.entries().map(|(k, v)| (k.to_string(), v.clone())).collect())?;
    let items = entries
        .into_iter()
        .map(|(key, value)| new_value(vec![("key".to_string(), Value::from(key)), ("value".to_string(), value)]))
        .collect();
    Ok(array::new_value(items))
}

fn lookup(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    with_aa(this, |aa| aa.get(key_arg(args)).cloned().unwrap_or(Value::Invalid))
}

fn lookup_ci(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    with_aa(this, |aa| aa.get_ci(key_arg(args)).cloned().unwrap_or(Value::Invalid))
}

fn set_mode_case_sensitive(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_aa(this, |aa| aa.set_case_sensitive())?;
    Ok(Value::Invalid)
}

fn is_empty(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_aa(this, |aa| Value::Bool(aa.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut aa = AssocArray::new();
        aa.set("Name", Value::from("a"));
        assert_eq!(aa.get("NAME"), Some(&Value::from("a")));
        aa.set("name", Value::from("b"));
        assert_eq!(aa.len(), 1);
        assert!(aa.remove("nAmE"));
        assert!(aa.is_empty());
    }

    #[test]
    fn test_case_sensitive_mode() {
        let mut aa = AssocArray::new();
        aa.set_case_sensitive();
        aa.set("Key", Value::Int32(1));
        aa.set("key", Value::Int32(2));
        assert_eq!(aa.len(), 2);
        assert_eq!(aa.get("KEY"), None);
        assert!(aa.get_ci("KEY").is_some());
    }

    #[test]
    fn test_get_member_prefers_element_over_method() {
        let obj = new_object(vec![("count".to_string(), Value::Int32(99))]);
        assert_eq!(get_member(&obj, "count"), Value::Int32(99));
    }

    #[test]
    fn test_get_member_falls_back_to_bound_method() {
        let obj = new_object(Vec::new());
        match get_member(&obj, "Count") {
            Value::Function(f) => {
                assert_eq!(f.name(), "count");
                assert!(f.receiver.is_some());
            }
            other => panic!("expected bound method, got {other:?}"),
        }
        assert!(get_member(&obj, "missing").is_invalid());
    }

    #[test]
    fn test_keys_iterate_in_order() {
        let obj = new_object(vec![
            ("b".to_string(), Value::Int32(2)),
            ("a".to_string(), Value::Int32(1)),
        ]);
        let keys = obj.borrow().as_assoc_array().map(|aa| aa.keys()).unwrap_or_default();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
