//! Boxed intrinsics: `roString`, `roBoolean`, `roInt`, `roLongInteger`,
//! `roFloat` and `roDouble`
//!
//! Calling a method on an intrinsic (`"abc".len()`, `5.toStr()`) boxes it
//! into one of these wrappers first. Each wrapper owns a copy of the value,
//! so mutating a temporary box never affects the original variable.

use std::rc::Rc;

use super::{method_table, string_ops, Component, ComponentKind, MethodTable};
use crate::error::EvalError;
use crate::eval::Interpreter;
use crate::value::format::sprintf;
use crate::value::{Callable, Object, Param, Signature, Value, ValueKind};

/// Wrap an intrinsic in its component. `invalid`, functions and objects
/// have no boxed form.
pub fn box_value(value: &Value) -> Option<Object> {
    let (name, table) = match value {
        Value::String(_) => ("roString", method_table("roString", string_table)),
        Value::Bool(_) => ("roBoolean", method_table("roBoolean", boolean_table)),
        Value::Int32(_) => ("roInt", method_table("roInt", int_table)),
        Value::Int64(_) => ("roLongInteger", method_table("roLongInteger", long_table)),
        Value::Float(_) => ("roFloat", method_table("roFloat", float_table)),
        Value::Double(_) => ("roDouble", method_table("roDouble", double_table)),
        _ => return None,
    };
    Some(Rc::new(std::cell::RefCell::new(Component::new(
        name,
        table,
        ComponentKind::Boxed(value.clone()),
    ))))
}

/// The intrinsic inside a boxed component.
pub fn unbox(object: &Object) -> Option<Value> {
    match &object.borrow().kind {
        ComponentKind::Boxed(inner) => Some(inner.clone()),
        _ => None,
    }
}

pub(super) fn inner(this: &Object) -> Result<Value, EvalError> {
    unbox(this).ok_or_else(|| EvalError::internal("receiver is not a boxed value"))
}

pub(super) fn replace(this: &Object, value: Value) -> Result<(), EvalError> {
    match &mut this.borrow_mut().kind {
        ComponentKind::Boxed(inner) => {
            *inner = value;
            Ok(())
        }
        _ => Err(EvalError::internal("receiver is not a boxed value")),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Shared Methods
// ═══════════════════════════════════════════════════════════════════════

fn get(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    inner(this)
}

fn set(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    replace(this, args.first().cloned().unwrap_or(Value::Invalid))?;
    Ok(Value::Invalid)
}

/// `equalTo(other)`: true only for a box of the same kind holding an equal
/// value. Bare intrinsics and other components never match.
fn equal_to(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let value = inner(this)?;
    let other = match args.first() {
        Some(Value::Object(obj)) => unbox(obj),
        _ => None,
    };
    Ok(Value::Bool(other.map_or(false, |other| other == value)))
}

/// `toStr([format])`: plain conversion, or printf-style with a format.
fn to_str(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let value = inner(this)?;
    match args.first().and_then(Value::as_str) {
        Some(format) => Ok(Value::from(sprintf(format, &value)?)),
        None => Ok(Value::from(value.to_string())),
    }
}

fn to_str_method() -> Callable {
    Callable::method(
        "toStr",
        Signature::new(
            vec![Param::optional("format", ValueKind::Dynamic, Value::Invalid)],
            ValueKind::String,
        ),
        to_str,
    )
}

fn accessors(kind: ValueKind, getter: &str, setter: &str) -> Vec<Callable> {
    vec![
        Callable::method(getter, Signature::new(vec![], kind), get),
        Callable::method(setter, Signature::new(vec![Param::required("value", kind)], ValueKind::Void), set),
        Callable::method(
            "equalTo",
            Signature::new(vec![Param::required("other", ValueKind::Dynamic)], ValueKind::Boolean),
            equal_to,
        ),
    ]
}

// ═══════════════════════════════════════════════════════════════════════
// Method Tables
// ═══════════════════════════════════════════════════════════════════════

fn string_table() -> MethodTable {
    MethodTable::new()
        .interface("ifString", accessors(ValueKind::String, "getString", "setString"))
        .interface("ifStringOps", string_ops::methods())
        .interface("ifToStr", vec![to_str_method()])
}

fn boolean_table() -> MethodTable {
    MethodTable::new()
        .interface("ifBoolean", accessors(ValueKind::Boolean, "getBoolean", "setBoolean"))
        .interface("ifToStr", vec![to_str_method()])
}

fn int_table() -> MethodTable {
    MethodTable::new()
        .interface("ifInt", accessors(ValueKind::Int32, "getInt", "setInt"))
        .interface("ifIntOps", vec![to_str_method()])
        .interface("ifToStr", vec![to_str_method()])
}

fn long_table() -> MethodTable {
    MethodTable::new()
        .interface("ifLongInt", accessors(ValueKind::Int64, "getLongInt", "setLongInt"))
        .interface("ifToStr", vec![to_str_method()])
}

fn float_table() -> MethodTable {
    MethodTable::new()
        .interface("ifFloat", accessors(ValueKind::Float, "getFloat", "setFloat"))
        .interface("ifToStr", vec![to_str_method()])
}

fn double_table() -> MethodTable {
    MethodTable::new()
        .interface("ifDouble", accessors(ValueKind::Double, "getDouble", "setDouble"))
        .interface("ifToStr", vec![to_str_method()])
}
