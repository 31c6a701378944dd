//! Binary operators and numeric promotion

use std::cmp::Ordering;

use super::{Evaluate, Interpreter};
use crate::ast::{BinaryOp, Expr};
use crate::component::boxed;
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::Value;

/// Evaluate `left op right`. `and`/`or` skip the right side when a
/// boolean left side already decides the result.
pub fn eval_binary(left: &Expr, op: BinaryOp, right: &Expr, interp: &mut Interpreter) -> Result<Value, EvalError> {
    let lhs = unbox(left.eval(interp)?);
    match (op, &lhs) {
        (BinaryOp::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
        (BinaryOp::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
        _ => {}
    }
    let rhs = right.eval(interp)?;
    apply(op, lhs, rhs)
}

/// Apply a binary operator to two evaluated operands. Boxed intrinsics
/// take part as the value they wrap.
pub fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let (lhs, rhs) = (unbox(lhs), unbox(rhs));
    match op {
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::String(a), Value::String(b)) => Ok(Value::from(format!("{a}{b}"))),
            _ => arithmetic(op, &lhs, &rhs),
        },
        BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::IntegerDivide
        | BinaryOp::Modulo
        | BinaryOp::Power => arithmetic(op, &lhs, &rhs),
        BinaryOp::LeftShift | BinaryOp::RightShift => shift(op, &lhs, &rhs),
        BinaryOp::Equal | BinaryOp::NotEqual => equality(op, &lhs, &rhs),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            comparison(op, &lhs, &rhs)
        }
        BinaryOp::And | BinaryOp::Or => logical(op, &lhs, &rhs),
    }
}

fn unbox(value: Value) -> Value {
    match &value {
        Value::Object(obj) => boxed::unbox(obj).unwrap_or(value),
        _ => value,
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "{} Operator \"{}\" can't be applied to \"{}\" and \"{}\".",
        RuntimeErrorDetail::TypeMismatch.message(),
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn divide_by_zero() -> EvalError {
    EvalError::runtime(RuntimeErrorDetail::DivideByZero, RuntimeErrorDetail::DivideByZero.message())
}

// ═══════════════════════════════════════════════════════════════════════
// Numeric Promotion
// ═══════════════════════════════════════════════════════════════════════

/// Two numeric operands converted to a common kind.
///
/// Precision ranks `Integer` below `Float` below `Double`. `LongInteger`
/// is the integral path: it absorbs `Integer`, but yields to either
/// floating kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Operands {
    Int(i32, i32),
    Long(i64, i64),
    Float(f32, f32),
    Double(f64, f64),
}

fn rank(value: &Value) -> Option<u8> {
    match value {
        Value::Int32(_) => Some(0),
        Value::Int64(_) => Some(1),
        Value::Float(_) => Some(2),
        Value::Double(_) => Some(3),
        _ => None,
    }
}

pub(crate) fn promote(lhs: &Value, rhs: &Value) -> Option<Operands> {
    let operands = match rank(lhs)?.max(rank(rhs)?) {
        0 => Operands::Int(lhs.to_i64()? as i32, rhs.to_i64()? as i32),
        1 => Operands::Long(lhs.to_i64()?, rhs.to_i64()?),
        2 => Operands::Float(lhs.as_f64()? as f32, rhs.as_f64()? as f32),
        _ => Operands::Double(lhs.as_f64()?, rhs.as_f64()?),
    };
    Some(operands)
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let operands = promote(lhs, rhs).ok_or_else(|| mismatch(op, lhs, rhs))?;
    use Operands::*;
    let value = match op {
        BinaryOp::Add => match operands {
            Int(a, b) => Value::Int32(a.wrapping_add(b)),
            Long(a, b) => Value::Int64(a.wrapping_add(b)),
            Float(a, b) => Value::Float(a + b),
            Double(a, b) => Value::Double(a + b),
        },
        BinaryOp::Subtract => match operands {
            Int(a, b) => Value::Int32(a.wrapping_sub(b)),
            Long(a, b) => Value::Int64(a.wrapping_sub(b)),
            Float(a, b) => Value::Float(a - b),
            Double(a, b) => Value::Double(a - b),
        },
        BinaryOp::Multiply => match operands {
            Int(a, b) => Value::Int32(a.wrapping_mul(b)),
            Long(a, b) => Value::Int64(a.wrapping_mul(b)),
            Float(a, b) => Value::Float(a * b),
            Double(a, b) => Value::Double(a * b),
        },
        // `/` always produces a floating result
        BinaryOp::Divide => match operands {
            Int(_, 0) | Long(_, 0) => return Err(divide_by_zero()),
            Int(a, b) => Value::Float(a as f32 / b as f32),
            Long(a, b) => Value::Double(a as f64 / b as f64),
            Float(a, b) => Value::Float(a / b),
            Double(a, b) => Value::Double(a / b),
        },
        // `\` always produces an integral result
        BinaryOp::IntegerDivide => match operands {
            Int(_, 0) | Long(_, 0) => return Err(divide_by_zero()),
            Float(_, b) if b == 0.0 => return Err(divide_by_zero()),
            Double(_, b) if b == 0.0 => return Err(divide_by_zero()),
            Int(a, b) => Value::Int32(a.wrapping_div(b)),
            Long(a, b) => Value::Int64(a.wrapping_div(b)),
            Float(a, b) => Value::Int32((a / b).trunc() as i32),
            Double(a, b) => Value::Int32((a / b).trunc() as i32),
        },
        BinaryOp::Modulo => match operands {
            Int(_, 0) | Long(_, 0) => return Err(divide_by_zero()),
            Float(_, b) if b == 0.0 => return Err(divide_by_zero()),
            Double(_, b) if b == 0.0 => return Err(divide_by_zero()),
            Int(a, b) => Value::Int32(a.wrapping_rem(b)),
            Long(a, b) => Value::Int64(a.wrapping_rem(b)),
            Float(a, b) => Value::Float((a % b).trunc()),
            Double(a, b) => Value::Double((a % b).trunc()),
        },
        BinaryOp::Power => match operands {
            Int(a, b) => Value::Float((a as f32).powf(b as f32)),
            Long(a, b) => match u32::try_from(b) {
                Ok(exp) => Value::Int64(a.wrapping_pow(exp)),
                Err(_) => Value::Double((a as f64).powf(b as f64)),
            },
            Float(a, b) => Value::Float(a.powf(b)),
            Double(a, b) => Value::Double(a.powf(b)),
        },
        _ => return Err(mismatch(op, lhs, rhs)),
    };
    Ok(value)
}

fn shift(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let (Some(value), Some(amount)) = (lhs.to_i64(), rhs.to_i64()) else {
        return Err(mismatch(op, lhs, rhs));
    };
    if !(0..32).contains(&amount) {
        return Err(EvalError::runtime(
            RuntimeErrorDetail::BadBitShift,
            RuntimeErrorDetail::BadBitShift.message(),
        ));
    }
    let amount = amount as u32;
    let left = op == BinaryOp::LeftShift;
    Ok(match lhs {
        Value::Int64(_) if left => Value::Int64(value.wrapping_shl(amount)),
        Value::Int64(_) => Value::Int64(value >> amount),
        _ if left => Value::Int32((value as i32).wrapping_shl(amount)),
        _ => Value::Int32((value as i32) >> amount),
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Comparison
// ═══════════════════════════════════════════════════════════════════════

fn numeric_order(operands: Operands) -> Option<Ordering> {
    match operands {
        Operands::Int(a, b) => Some(a.cmp(&b)),
        Operands::Long(a, b) => Some(a.cmp(&b)),
        Operands::Float(a, b) => a.partial_cmp(&b),
        Operands::Double(a, b) => a.partial_cmp(&b),
    }
}

/// `=` and `<>`. `invalid` compares against anything; other kinds must
/// match (after numeric promotion). References compare by identity.
fn equality(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let equal = match (lhs, rhs) {
        (Value::Invalid, other) | (other, Value::Invalid) => other.is_invalid(),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Object(_), Value::Object(_)) | (Value::Function(_), Value::Function(_)) => lhs == rhs,
        _ => match promote(lhs, rhs) {
            Some(operands) => numeric_order(operands) == Some(Ordering::Equal),
            None => return Err(mismatch(op, lhs, rhs)),
        },
    };
    Ok(Value::Bool(if op == BinaryOp::Equal { equal } else { !equal }))
}

fn comparison(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let order = match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => numeric_order(promote(lhs, rhs).ok_or_else(|| mismatch(op, lhs, rhs))?),
    };
    // NaN compares false to everything
    let Some(order) = order else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Less => order == Ordering::Less,
        BinaryOp::LessEqual => order != Ordering::Greater,
        BinaryOp::Greater => order == Ordering::Greater,
        BinaryOp::GreaterEqual => order != Ordering::Less,
        _ => return Err(mismatch(op, lhs, rhs)),
    };
    Ok(Value::Bool(result))
}

/// `and`/`or`: logical on booleans, bitwise on numbers. Mixing the two
/// treats a number as true when non-zero.
fn logical(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let and = op == BinaryOp::And;
    let truthy = |v: &Value| match v {
        Value::Bool(b) => Some(*b),
        other => other.as_f64().map(|n| n != 0.0),
    };
    match (lhs, rhs) {
        (Value::Bool(_), _) | (_, Value::Bool(_)) => {
            let (Some(a), Some(b)) = (truthy(lhs), truthy(rhs)) else {
                return Err(mismatch(op, lhs, rhs));
            };
            Ok(Value::Bool(if and { a && b } else { a || b }))
        }
        _ => {
            let (Some(a), Some(b)) = (lhs.to_i64(), rhs.to_i64()) else {
                return Err(mismatch(op, lhs, rhs));
            };
            let bits = if and { a & b } else { a | b };
            if matches!(lhs, Value::Int64(_)) || matches!(rhs, Value::Int64(_)) {
                Ok(Value::Int64(bits))
            } else {
                Ok(Value::Int32(bits as i32))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(op: BinaryOp, lhs: impl Into<Value>, rhs: impl Into<Value>) -> Result<Value, EvalError> {
        apply(op, lhs.into(), rhs.into())
    }

    #[test]
    fn test_promotion_order() {
        assert_eq!(run(BinaryOp::Add, 1, 2).unwrap(), Value::Int32(3));
        assert_eq!(run(BinaryOp::Add, 1, 2.5f32).unwrap(), Value::Float(3.5));
        assert_eq!(run(BinaryOp::Add, 1.5f32, 2.0f64).unwrap(), Value::Double(3.5));
        assert_eq!(run(BinaryOp::Add, 1, 2i64).unwrap(), Value::Int64(3));
        assert_eq!(run(BinaryOp::Add, 2i64, 0.5f32).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_string_concatenation_requires_two_strings() {
        assert_eq!(run(BinaryOp::Add, "a", "b").unwrap(), Value::from("ab"));
        let err = run(BinaryOp::Add, "a", 1).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_division_kinds() {
        assert_eq!(run(BinaryOp::Divide, 5, 2).unwrap(), Value::Float(2.5));
        assert_eq!(run(BinaryOp::IntegerDivide, 7, 2).unwrap(), Value::Int32(3));
        assert_eq!(run(BinaryOp::IntegerDivide, 7.5f64, 2).unwrap(), Value::Int32(3));
        assert_eq!(run(BinaryOp::Modulo, -7, 3).unwrap(), Value::Int32(-1));
        let err = run(BinaryOp::Divide, 1, 0).unwrap_err();
        assert_eq!(err.detail(), Some(RuntimeErrorDetail::DivideByZero));
    }

    #[test]
    fn test_integer_overflow_wraps() {
        assert_eq!(run(BinaryOp::Add, i32::MAX, 1).unwrap(), Value::Int32(i32::MIN));
    }

    #[test]
    fn test_shift_limits() {
        assert_eq!(run(BinaryOp::LeftShift, 1, 4).unwrap(), Value::Int32(16));
        assert_eq!(run(BinaryOp::RightShift, -16, 2).unwrap(), Value::Int32(-4));
        let err = run(BinaryOp::LeftShift, 1, 32).unwrap_err();
        assert_eq!(err.detail(), Some(RuntimeErrorDetail::BadBitShift));
    }

    #[test]
    fn test_equality_rules() {
        assert_eq!(run(BinaryOp::Equal, 1, 1.0f64).unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::Equal, Value::Invalid, Value::Invalid).unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::NotEqual, "a", Value::Invalid).unwrap(), Value::Bool(true));
        assert!(run(BinaryOp::Equal, "1", 1).unwrap_err().is_type_error());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(run(BinaryOp::Less, "apple", "banana").unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::GreaterEqual, 2, 2.0f32).unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::Less, f64::NAN, 1).unwrap(), Value::Bool(false));
        assert!(run(BinaryOp::Less, true, false).unwrap_err().is_type_error());
    }

    #[test]
    fn test_logical_and_bitwise() {
        assert_eq!(run(BinaryOp::And, true, false).unwrap(), Value::Bool(false));
        assert_eq!(run(BinaryOp::Or, false, 2).unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::And, 6, 3).unwrap(), Value::Int32(2));
        assert_eq!(run(BinaryOp::Or, 4i64, 1).unwrap(), Value::Int64(5));
        assert!(run(BinaryOp::And, "x", true).unwrap_err().is_type_error());
    }

    #[test]
    fn test_boxed_operands_are_unwrapped() {
        let boxed = Value::Object(boxed::box_value(&Value::Int32(4)).unwrap());
        assert_eq!(apply(BinaryOp::Multiply, boxed, Value::Int32(2)).unwrap(), Value::Int32(8));
    }
}
