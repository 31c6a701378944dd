//! Indexed access: `object[index]` and `object[index] = value`

use super::{Evaluate, Interpreter};
use crate::ast::Expr;
use crate::component::{assoc_array, boxed, node, ComponentKind};
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::value::Object;
use crate::Value;

pub fn eval_indexed_get(object: &Expr, index: &Expr, interp: &mut Interpreter) -> Result<Value, EvalError> {
    let target = object.eval(interp)?;
    let index = index.eval(interp)?;
    get_index(&target, &index)
}

/// Arrays take a numeric index and read `invalid` past the end.
/// Associative arrays and nodes take a string key; any other key kind is
/// a type error.
pub fn get_index(target: &Value, index: &Value) -> Result<Value, EvalError> {
    let (object, container) = classify(target)?;
    match container {
        Container::Array => {
            let position = numeric_index(index)?;
            let component = object.borrow();
            Ok(component.as_array().map_or(Value::Invalid, |items| items.get(position)))
        }
        Container::AssocArray => Ok(assoc_array::get_member(object, string_key(index)?)),
        Container::Node => Ok(node::get_member(object, string_key(index)?)),
    }
}

pub fn set_index(interp: &mut Interpreter, target: &Value, index: &Value, value: Value) -> Result<(), EvalError> {
    let (object, container) = classify(target)?;
    match container {
        Container::Array => {
            let position = numeric_index(index)?;
            let mut component = object.borrow_mut();
            match component.as_array_mut() {
                Some(items) => items.set(position, value),
                None => Err(not_indexable(target)),
            }
        }
        Container::AssocArray => {
            assoc_array::insert(object, string_key(index)?, value);
            Ok(())
        }
        Container::Node => node::set_member(interp, object, string_key(index)?, value),
    }
}

enum Container {
    Array,
    AssocArray,
    Node,
}

fn classify(target: &Value) -> Result<(&Object, Container), EvalError> {
    let Value::Object(object) = target else {
        return Err(not_indexable(target));
    };
    let component = object
        .try_borrow()
        .map_err(|_| EvalError::internal("component is already in use"))?;
    let container = match component.kind {
        ComponentKind::Array(_) => Container::Array,
        ComponentKind::AssocArray(_) => Container::AssocArray,
        ComponentKind::Node(_) => Container::Node,
        ComponentKind::Boxed(_) => return Err(not_indexable(target)),
    };
    Ok((object, container))
}

fn numeric_index(index: &Value) -> Result<i64, EvalError> {
    let index = match index {
        Value::Object(obj) => boxed::unbox(obj).unwrap_or(Value::Invalid),
        other => other.clone(),
    };
    index.to_i64().ok_or_else(|| {
        EvalError::runtime(
            RuntimeErrorDetail::NonNumericArrayIndex,
            format!(
                "{} Got {}.",
                RuntimeErrorDetail::NonNumericArrayIndex.message(),
                index.type_name()
            ),
        )
    })
}

fn string_key(index: &Value) -> Result<&str, EvalError> {
    index.as_str().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "{} Associative array key must be a String, got {}.",
            RuntimeErrorDetail::TypeMismatch.message(),
            index.type_name()
        ))
    })
}

fn not_indexable(target: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "{} {} cannot be indexed.",
        RuntimeErrorDetail::TypeMismatch.message(),
        target.type_name()
    ))
}
