//! Unary operators: `-`, `+` and `not`

use super::{Evaluate, Interpreter};
use crate::ast::{Expr, UnaryOp};
use crate::component::boxed;
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::Value;

pub fn eval_unary(op: UnaryOp, operand: &Expr, interp: &mut Interpreter) -> Result<Value, EvalError> {
    let value = operand.eval(interp)?;
    apply(op, value)
}

pub fn apply(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    let value = match &value {
        Value::Object(obj) => boxed::unbox(obj).unwrap_or(value),
        _ => value,
    };
    let result = match (op, &value) {
        (UnaryOp::Negate, Value::Int32(n)) => Value::Int32(n.wrapping_neg()),
        (UnaryOp::Negate, Value::Int64(n)) => Value::Int64(n.wrapping_neg()),
        (UnaryOp::Negate, Value::Float(n)) => Value::Float(-n),
        (UnaryOp::Negate, Value::Double(n)) => Value::Double(-n),
        (UnaryOp::Plus, v) if v.is_numeric() => value.clone(),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        // `not` on a number is bitwise complement
        (UnaryOp::Not, Value::Int32(n)) => Value::Int32(!n),
        (UnaryOp::Not, Value::Int64(n)) => Value::Int64(!n),
        (UnaryOp::Not, Value::Float(n)) => Value::Int32(!(*n as i32)),
        (UnaryOp::Not, Value::Double(n)) => Value::Int32(!(*n as i32)),
        _ => {
            let symbol = match op {
                UnaryOp::Negate => "-",
                UnaryOp::Plus => "+",
                UnaryOp::Not => "not",
            };
            return Err(EvalError::type_mismatch(format!(
                "{} Operator \"{symbol}\" can't be applied to \"{}\".",
                RuntimeErrorDetail::TypeMismatch.message(),
                value.type_name()
            )));
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negate_keeps_kind() {
        assert_eq!(apply(UnaryOp::Negate, Value::Int32(3)).unwrap(), Value::Int32(-3));
        assert_eq!(apply(UnaryOp::Negate, Value::Float(1.5)).unwrap(), Value::Float(-1.5));
        assert_eq!(apply(UnaryOp::Negate, Value::Int64(7)).unwrap(), Value::Int64(-7));
    }

    #[test]
    fn test_not() {
        assert_eq!(apply(UnaryOp::Not, Value::Bool(true)).unwrap(), Value::Bool(false));
        assert_eq!(apply(UnaryOp::Not, Value::Int32(0)).unwrap(), Value::Int32(-1));
    }

    #[test]
    fn test_type_errors() {
        assert!(apply(UnaryOp::Negate, Value::from("x")).unwrap_err().is_type_error());
        assert!(apply(UnaryOp::Not, Value::Invalid).unwrap_err().is_type_error());
        assert!(apply(UnaryOp::Plus, Value::Bool(true)).unwrap_err().is_type_error());
    }
}
