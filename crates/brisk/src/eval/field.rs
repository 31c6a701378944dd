//! Dotted member access: `object.name` and `object.name = value`

use super::{Evaluate, Interpreter};
use crate::ast::Expr;
use crate::component::{assoc_array, bound_method, boxed, node, ComponentKind};
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::value::Object;
use crate::Value;

pub fn eval_dotted_get(object: &Expr, name: &str, interp: &mut Interpreter) -> Result<Value, EvalError> {
    let target = object.eval(interp)?;
    get_member(&target, name)
}

/// Read member `name` of `target`.
///
/// Associative arrays and nodes expose their elements and fields first and
/// fall back to methods. Other components expose only methods. Intrinsics
/// are boxed so their interface methods can be reached.
pub fn get_member(target: &Value, name: &str) -> Result<Value, EvalError> {
    let object = match target {
        Value::Object(obj) => obj.clone(),
        Value::Invalid | Value::Function(_) => return Err(dot_on_non_object(target)),
        intrinsic => boxed::box_value(intrinsic).ok_or_else(|| dot_on_non_object(target))?,
    };
    let kind = component_kind(&object)?;
    match kind {
        Kind::AssocArray => Ok(assoc_array::get_member(&object, name)),
        Kind::Node => Ok(node::get_member(&object, name)),
        Kind::Other => bound_method(&object, name)
            .map(Value::Function)
            .ok_or_else(|| member_not_found(&object, name)),
    }
}

/// Write member `name` of `target`.
pub fn set_member(interp: &mut Interpreter, target: &Value, name: &str, value: Value) -> Result<(), EvalError> {
    let Value::Object(object) = target else {
        return Err(dot_on_non_object(target));
    };
    match component_kind(object)? {
        Kind::AssocArray => {
            assoc_array::insert(object, name, value);
            Ok(())
        }
        Kind::Node => node::set_member(interp, object, name, value),
        Kind::Other => Err(EvalError::runtime(
            RuntimeErrorDetail::BadLHS,
            format!(
                "{} {} has no assignable member '{name}'",
                RuntimeErrorDetail::BadLHS.message(),
                target.type_name()
            ),
        )),
    }
}

enum Kind {
    AssocArray,
    Node,
    Other,
}

fn component_kind(object: &Object) -> Result<Kind, EvalError> {
    let component = object
        .try_borrow()
        .map_err(|_| EvalError::internal("component is already in use"))?;
    Ok(match component.kind {
        ComponentKind::AssocArray(_) => Kind::AssocArray,
        ComponentKind::Node(_) => Kind::Node,
        _ => Kind::Other,
    })
}

pub(crate) fn dot_on_non_object(target: &Value) -> EvalError {
    EvalError::runtime(
        RuntimeErrorDetail::DotOnNonObject,
        format!(
            "{} Got {}.",
            RuntimeErrorDetail::DotOnNonObject.message(),
            target.type_name()
        ),
    )
}

pub(crate) fn member_not_found(object: &Object, name: &str) -> EvalError {
    let component = object.try_borrow().map(|c| c.name()).unwrap_or("Object");
    EvalError::runtime(
        RuntimeErrorDetail::MemberFunctionNotFound,
        format!(
            "{} '{name}' on {component}",
            RuntimeErrorDetail::MemberFunctionNotFound.message()
        ),
    )
}
