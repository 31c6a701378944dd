//! Assignment statements
//!
//! Plain `=` and the compound forms (`+=`, `<<=`, ... and `++`/`--`) on
//! variables, dotted members and indexed elements.

use super::{binary, field, index, uninitialized, Evaluate, Interpreter};
use crate::ast::{BinaryOp, Expr};
use crate::EvalError;

/// Assign to a local variable.
///
/// # Errors
///
/// Compound assignment to an undefined variable is an
/// `UninitializedVariable` error.
pub fn exec_assign(name: &str, op: Option<BinaryOp>, value: &Expr, interp: &mut Interpreter) -> Result<(), EvalError> {
    let rhs = value.eval(interp)?;
    let value = match op {
        None => rhs,
        Some(op) => {
            let current = interp.env().get(name).cloned().ok_or_else(|| uninitialized(name))?;
            binary::apply(op, current, rhs)?
        }
    };
    interp.env_mut().define(name, value);
    Ok(())
}

/// `object.name = value`
pub fn exec_dotted_set(
    object: &Expr,
    name: &str,
    op: Option<BinaryOp>,
    value: &Expr,
    interp: &mut Interpreter,
) -> Result<(), EvalError> {
    let target = object.eval(interp)?;
    let rhs = value.eval(interp)?;
    let value = match op {
        None => rhs,
        Some(op) => binary::apply(op, field::get_member(&target, name)?, rhs)?,
    };
    field::set_member(interp, &target, name, value)
}

/// `object[index] = value`
pub fn exec_indexed_set(
    object: &Expr,
    index: &Expr,
    op: Option<BinaryOp>,
    value: &Expr,
    interp: &mut Interpreter,
) -> Result<(), EvalError> {
    let target = object.eval(interp)?;
    let key = index.eval(interp)?;
    let rhs = value.eval(interp)?;
    let value = match op {
        None => rhs,
        Some(op) => binary::apply(op, index::get_index(&target, &key)?, rhs)?,
    };
    index::set_index(interp, &target, &key, value)
}

#[cfg(test)]
mod tests {
    use crate::error::RuntimeErrorDetail;
    use crate::host::CaptureSink;
    use crate::{Interpreter, Value};

    fn eval(source: &str) -> Interpreter {
        let mut interp = Interpreter::new().with_output(CaptureSink::new());
        interp.eval_source("test.brs", source).unwrap();
        interp
    }

    #[test]
    fn test_compound_assignment() {
        let interp = eval("x = 10\nx += 5\nx -= 1\nx *= 2\nx \\= 4\n");
        assert_eq!(interp.env().get("x"), Some(&Value::Int32(7)));
    }

    #[test]
    fn test_increment_and_shift() {
        let interp = eval("n = 1\nn++\nn <<= 3\n");
        assert_eq!(interp.env().get("n"), Some(&Value::Int32(16)));
    }

    #[test]
    fn test_compound_on_undefined_variable() {
        let mut interp = Interpreter::new().with_output(CaptureSink::new());
        let err = interp.eval_source("test.brs", "total += 1").unwrap_err();
        match err {
            crate::BriskError::Runtime(e) => assert_eq!(e.detail, RuntimeErrorDetail::UninitializedVariable),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_member_and_index_compound() {
        let interp = eval("a = {n: 1}\na.n += 2\nb = [1, 2]\nb[1] *= 10\nx = a.n + b[1]\n");
        assert_eq!(interp.env().get("x"), Some(&Value::Int32(23)));
    }

    #[test]
    fn test_string_append() {
        let interp = eval("s = \"ab\"\ns += \"cd\"\n");
        assert_eq!(interp.env().get("s"), Some(&Value::from("abcd")));
    }
}
