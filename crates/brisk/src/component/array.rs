//! `roArray`: growable, zero-indexed list of values

use std::cmp::Ordering;
use std::rc::Rc;

use super::{method_table, Component, ComponentKind, MethodTable};
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::eval::Interpreter;
use crate::value::{Callable, MethodFn, Object, Param, Signature, Value, ValueKind};

pub const NAME: &str = "roArray";

#[derive(Debug, Clone, Default)]
pub struct RoArray {
    elements: Vec<Value>,
}

impl RoArray {
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`, `invalid` when out of range.
    pub fn get(&self, index: i64) -> Value {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.elements.get(i).cloned())
            .unwrap_or(Value::Invalid)
    }

    /// Store at `index`, growing with `invalid` as needed.
    pub fn set(&mut self, index: i64, value: Value) -> Result<(), EvalError> {
        let index = usize::try_from(index).map_err(|_| {
            EvalError::runtime(
                RuntimeErrorDetail::IndexOutOfBounds,
                format!("Array index {index} is negative"),
            )
        })?;
        if index >= self.elements.len() {
            self.elements.resize(index + 1, Value::Invalid);
        }
        self.elements[index] = value;
        Ok(())
    }

    pub fn push(&mut self, value: Value) {
        self.elements.push(value);
    }
}

fn table() -> Rc<MethodTable> {
    method_table(NAME, build_table)
}

pub fn new_object(elements: Vec<Value>) -> Object {
    Rc::new(std::cell::RefCell::new(Component::new(
        NAME,
        table(),
        ComponentKind::Array(RoArray::new(elements)),
    )))
}

pub fn new_value(elements: Vec<Value>) -> Value {
    Value::Object(new_object(elements))
}

// ═══════════════════════════════════════════════════════════════════════
// Methods
// ═══════════════════════════════════════════════════════════════════════

fn build_table() -> MethodTable {
    use ValueKind as K;
    let none = |name: &str, returns: ValueKind, f: MethodFn| Callable::method(name, Signature::new(vec![], returns), f);
    MethodTable::new()
        .interface(
            "ifArray",
            vec![
                none("peek", K::Dynamic, peek),
                none("pop", K::Dynamic, pop),
                Callable::method("push", Signature::new(vec![Param::required("value", K::Dynamic)], K::Void), push),
                none("shift", K::Dynamic, shift),
                Callable::method("unshift", Signature::new(vec![Param::required("value", K::Dynamic)], K::Void), unshift),
                Callable::method("delete", Signature::new(vec![Param::required("index", K::Int32)], K::Boolean), delete),
                none("count", K::Int32, count),
                none("clear", K::Void, clear),
                Callable::method("append", Signature::new(vec![Param::required("other", K::Object)], K::Void), append),
            ],
        )
        .interface(
            "ifArrayGet",
            vec![Callable::method(
                "getEntry",
                Signature::new(vec![Param::required("index", K::Int32)], K::Dynamic),
                get_entry,
            )],
        )
        .interface(
            "ifArraySet",
            vec![Callable::method(
                "setEntry",
                Signature::new(
                    vec![Param::required("index", K::Int32), Param::required("value", K::Dynamic)],
                    K::Void,
                ),
                set_entry,
            )],
        )
        .interface(
            "ifArrayJoin",
            vec![Callable::method(
                "join",
                Signature::new(vec![Param::optional("separator", K::String, Value::from(""))], K::String),
                join,
            )],
        )
        .interface(
            "ifArraySort",
            vec![
                Callable::method(
                    "sort",
                    Signature::new(vec![Param::optional("flags", K::String, Value::from(""))], K::Void),
                    sort,
                ),
                none("reverse", K::Void, reverse),
            ],
        )
        .interface("ifEnum", vec![none("isEmpty", K::Boolean, is_empty)])
}

fn with_array<T>(this: &Object, f: impl FnOnce(&mut RoArray) -> T) -> Result<T, EvalError> {
    let mut component = this.borrow_mut();
    let array = component
        .as_array_mut()
        .ok_or_else(|| EvalError::internal("receiver is not an array"))?;
    Ok(f(array))
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Invalid)
}

fn peek(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| a.elements.last().cloned().unwrap_or(Value::Invalid))
}

fn pop(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| a.elements.pop().unwrap_or(Value::Invalid))
}

fn push(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| a.push(arg(args, 0)))?;
    Ok(Value::Invalid)
}

fn shift(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| {
        if a.elements.is_empty() {
            Value::Invalid
        } else {
            a.elements.remove(0)
        }
    })
}

fn unshift(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| a.elements.insert(0, arg(args, 0)))?;
    Ok(Value::Invalid)
}

fn delete(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let index = arg(args, 0).to_i64().unwrap_or(-1);
    with_array(this, |a| match usize::try_from(index) {
        Ok(i) if i < a.elements.len() => {
            a.elements.remove(i);
            Value::Bool(true)
        }
        _ => Value::Bool(false),
    })
}

fn count(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| Value::Int32(a.len() as i32))
}

fn clear(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| a.elements.clear())?;
    Ok(Value::Invalid)
}

fn append(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let other = match args.first() {
        Some(Value::Object(obj)) => obj.clone(),
        _ => return Err(EvalError::type_mismatch("append expects an array")),
    };
    let items: Vec<Value> = match other.borrow().as_array() {
        Some(a) => a.elements.clone(),
        None => return Err(EvalError::type_mismatch("append expects an array")),
    };
    with_array(this, |a| a.elements.extend(items))?;
    Ok(Value::Invalid)
}

fn get_entry(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let index = arg(args, 0).to_i64().unwrap_or(-1);
    with_array(this, |a| a.get(index))
}

fn set_entry(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let index = arg(args, 0).to_i64().unwrap_or(-1);
    with_array(this, |a| a.set(index, arg(args, 1)))??;
    Ok(Value::Invalid)
}

fn join(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let separator = arg(args, 0).as_str().unwrap_or_default().to_string();
    let parts: Option<Vec<String>> =
        with_array(this, |a| a.elements.iter().map(|v| v.as_str().map(str::to_string)).collect())?;
    match parts {
        Some(parts) => Ok(Value::from(parts.join(&separator))),
        // Joining anything but strings yields an empty string
        None => Ok(Value::from("")),
    }
}

/// Numbers first in ascending order, then strings, then everything else
/// in its original order.
fn sort_order(a: &Value, b: &Value, case_insensitive: bool) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            v if v.is_numeric() => 0,
            Value::String(_) => 1,
            _ => 2,
        }
    }
    match (rank(a), rank(b)) {
        (0, 0) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (1, 1) => {
            let (x, y) = (a.as_str().unwrap_or_default(), b.as_str().unwrap_or_default());
            if case_insensitive {
                x.to_lowercase().cmp(&y.to_lowercase())
            } else {
                x.cmp(y)
            }
        }
        (ra, rb) => ra.cmp(&rb),
    }
}

fn sort(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let flags = arg(args, 0).as_str().unwrap_or_default().to_lowercase();
    if flags.chars().any(|c| c != 'i' && c != 'r') {
        return Ok(Value::Invalid);
    }
    let case_insensitive = flags.contains('i');
    let reverse = flags.contains('r');
    with_array(this, |a| {
        a.elements.sort_by(|x, y| sort_order(x, y, case_insensitive));
        if reverse {
            a.elements.reverse();
        }
    })?;
    Ok(Value::Invalid)
}

fn reverse(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| a.elements.reverse())?;
    Ok(Value::Invalid)
}

fn is_empty(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_array(this, |a| Value::Bool(a.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_out_of_range_is_invalid() {
        let a = RoArray::new(vec![Value::Int32(1)]);
        assert_eq!(a.get(0), Value::Int32(1));
        assert!(a.get(5).is_invalid());
        assert!(a.get(-1).is_invalid());
    }

    #[test]
    fn test_set_grows_with_invalid() {
        let mut a = RoArray::new(vec![]);
        a.set(2, Value::Int32(9)).unwrap();
        assert_eq!(a.elements(), &[Value::Invalid, Value::Invalid, Value::Int32(9)]);
        assert!(a.set(-1, Value::Invalid).is_err());
    }

    #[test]
    fn test_sort_order_numbers_before_strings() {
        let mut values = vec![Value::from("b"), Value::Int32(3), Value::from("A"), Value::Float(1.5)];
        values.sort_by(|x, y| sort_order(x, y, false));
        assert_eq!(values, vec![Value::Float(1.5), Value::Int32(3), Value::from("A"), Value::from("b")]);
    }
}
