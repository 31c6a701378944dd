//! Loop statements: `for`, `for each` and `while`

use super::control::{ControlFlow, LoopKind};
use super::stmt::{condition, exec_block};
use super::{binary, uninitialized, Evaluate, Interpreter};
use crate::ast::{BinaryOp, Expr, Stmt};
use crate::component::boxed;
use crate::error::RuntimeErrorDetail;
use crate::{EvalError, Value};

/// What the loop should do after one pass over its body.
enum Next {
    Continue,
    Break,
}

/// Run one iteration, absorbing `exit`/`continue` aimed at this loop.
fn iterate(body: &[Stmt], kind: LoopKind, interp: &mut Interpreter) -> Result<Next, EvalError> {
    match exec_block(body, interp) {
        Ok(()) => Ok(Next::Continue),
        Err(EvalError::ControlFlow(flow)) if flow.matches_loop(kind) => match flow {
            ControlFlow::Exit(_) => Ok(Next::Break),
            _ => Ok(Next::Continue),
        },
        Err(e) => Err(e),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// for ... to ... step
// ═══════════════════════════════════════════════════════════════════════

/// `for counter = start to end step step`.
///
/// The end value and the step are evaluated once. A fractional step is
/// truncated to an Integer. The counter is read back from the frame on
/// every pass, so the body may change it.
pub fn exec_for(
    counter: &str,
    start: &Expr,
    end: &Expr,
    step: Option<&Expr>,
    body: &[Stmt],
    interp: &mut Interpreter,
) -> Result<(), EvalError> {
    let start = start.eval(interp)?;
    interp.env_mut().define(counter, start);
    let end = end.eval(interp)?;
    let step = match step {
        Some(expr) => expr.eval(interp)?,
        None => Value::Int32(1),
    };
    let step = match step {
        Value::Float(n) => Value::Int32(n.trunc() as i32),
        Value::Double(n) => Value::Int32(n.trunc() as i32),
        other if other.is_numeric() => other,
        other => {
            return Err(EvalError::type_mismatch(format!(
                "{} \"for\" step must be numeric, got {}.",
                RuntimeErrorDetail::TypeMismatch.message(),
                other.type_name()
            )))
        }
    };
    let ascending = step.as_f64().is_some_and(|n| n > 0.0);
    let past_end = if ascending { BinaryOp::Greater } else { BinaryOp::Less };

    loop {
        if interp.ctx().is_interrupted() {
            return Err(EvalError::Interrupted);
        }
        let current = interp.env().get(counter).cloned().ok_or_else(|| uninitialized(counter))?;
        if binary::apply(past_end, current, end.clone())?.is_true() {
            break;
        }
        if let Next::Break = iterate(body, LoopKind::For, interp)? {
            break;
        }
        let current = interp.env().get(counter).cloned().ok_or_else(|| uninitialized(counter))?;
        let next = binary::apply(BinaryOp::Add, current, step.clone())?;
        interp.env_mut().define(counter, next);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// for each ... in
// ═══════════════════════════════════════════════════════════════════════

/// `for each item in collection`.
///
/// Arrays are iterated over a snapshot of their elements taken when the
/// loop starts. Associative arrays yield their keys in sorted order.
pub fn exec_for_each(item: &str, collection: &Expr, body: &[Stmt], interp: &mut Interpreter) -> Result<(), EvalError> {
    let target = collection.eval(interp)?;
    let items = match &target {
        Value::Object(obj) if boxed::unbox(obj).is_none() => {
            let component = obj.borrow();
            if let Some(array) = component.as_array() {
                array.elements().to_vec()
            } else if let Some(aa) = component.as_assoc_array() {
                aa.keys().into_iter().map(Value::from).collect()
            } else {
                return Err(not_iterable(&target));
            }
        }
        _ => return Err(not_iterable(&target)),
    };

    for value in items {
        if interp.ctx().is_interrupted() {
            return Err(EvalError::Interrupted);
        }
        interp.env_mut().define(item, value);
        if let Next::Break = iterate(body, LoopKind::For, interp)? {
            break;
        }
    }
    Ok(())
}

fn not_iterable(value: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "{} \"for each\" requires an iterable object, got {}.",
        RuntimeErrorDetail::TypeMismatch.message(),
        value.type_name()
    ))
}

// ═══════════════════════════════════════════════════════════════════════
// while
// ═══════════════════════════════════════════════════════════════════════

pub fn exec_while(cond: &Expr, body: &[Stmt], interp: &mut Interpreter) -> Result<(), EvalError> {
    loop {
        if interp.ctx().is_interrupted() {
            return Err(EvalError::Interrupted);
        }
        if !condition(cond, interp, "while")? {
            break;
        }
        if let Next::Break = iterate(body, LoopKind::While, interp)? {
            break;
        }
    }
    Ok(())
}
