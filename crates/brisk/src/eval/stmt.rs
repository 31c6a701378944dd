//! Statement execution

use tracing::debug;

use super::assign::{exec_assign, exec_dotted_set, exec_indexed_set};
use super::control::{ControlFlow, LoopKind};
use super::{function, loops, Evaluate, Interpreter};
use crate::ast::{Expr, IfBranch, PrintItem, Stmt, StmtKind};
use crate::component::{assoc_array, boxed};
use crate::error::{RuntimeError, RuntimeErrorDetail};
use crate::{EvalError, Value};

/// Width of a `,` print zone.
const PRINT_ZONE: usize = 16;

/// Execute statements in order, stopping at the first error or control
/// flow signal.
///
/// # Errors
///
/// Returns errors from statement execution, with the location of the
/// innermost failing statement attached.
pub fn exec_block(stmts: &[Stmt], interp: &mut Interpreter) -> Result<(), EvalError> {
    for stmt in stmts {
        exec_stmt(stmt, interp)?;
    }
    Ok(())
}

/// Execute a single statement.
pub fn exec_stmt(stmt: &Stmt, interp: &mut Interpreter) -> Result<(), EvalError> {
    // Statement boundaries are where host commands are picked up
    if interp.ctx().is_interrupted() {
        return Err(EvalError::Interrupted);
    }
    if interp.ctx().trace {
        debug!(location = %stmt.location, "exec");
    }
    exec_kind(&stmt.kind, interp).map_err(|e| e.at(&stmt.location))
}

fn exec_kind(kind: &StmtKind, interp: &mut Interpreter) -> Result<(), EvalError> {
    match kind {
        StmtKind::Expression(expr) => expr.eval(interp).map(drop),
        StmtKind::Assign { name, op, value } => exec_assign(name, *op, value, interp),
        StmtKind::DottedSet { object, name, op, value } => exec_dotted_set(object, name, *op, value, interp),
        StmtKind::IndexedSet {
            object,
            index,
            op,
            value,
        } => exec_indexed_set(object, index, *op, value, interp),
        StmtKind::Print(items) => exec_print(items, interp),
        StmtKind::If { branches, else_branch } => exec_if(branches, else_branch.as_deref(), interp),
        StmtKind::For {
            counter,
            start,
            end,
            step,
            body,
        } => loops::exec_for(counter, start, end, step.as_ref(), body, interp),
        StmtKind::ForEach { item, collection, body } => loops::exec_for_each(item, collection, body, interp),
        StmtKind::While { condition, body } => loops::exec_while(condition, body, interp),
        StmtKind::ExitFor => Err(EvalError::ControlFlow(ControlFlow::Exit(LoopKind::For))),
        StmtKind::ExitWhile => Err(EvalError::ControlFlow(ControlFlow::Exit(LoopKind::While))),
        StmtKind::ContinueFor => Err(EvalError::ControlFlow(ControlFlow::Continue(LoopKind::For))),
        StmtKind::ContinueWhile => Err(EvalError::ControlFlow(ControlFlow::Continue(LoopKind::While))),
        StmtKind::Return(value) => {
            let value = match value {
                Some(expr) => expr.eval(interp)?,
                None => Value::Invalid,
            };
            Err(EvalError::ControlFlow(ControlFlow::return_value(value)))
        }
        StmtKind::Function(decl) => {
            function::define_function(interp, decl);
            Ok(())
        }
        StmtKind::Try {
            body,
            catch_var,
            catch_body,
        } => exec_try(body, catch_var.as_deref(), catch_body, interp),
        StmtKind::Throw(value) => Err(EvalError::Runtime(thrown(value.eval(interp)?))),
        StmtKind::End => Err(EvalError::End),
        StmtKind::Stop => {
            debug!("stop statement ignored; no debugger attached");
            Ok(())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Conditions
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate an `if` or `while` condition. Only booleans (boxed or not)
/// are accepted.
pub(crate) fn condition(expr: &Expr, interp: &mut Interpreter, keyword: &str) -> Result<bool, EvalError> {
    let value = expr.eval(interp)?;
    let value = match &value {
        Value::Object(obj) => boxed::unbox(obj).unwrap_or(value),
        _ => value,
    };
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::type_mismatch(format!(
            "{} \"{keyword}\" condition must be Boolean, got {}.",
            RuntimeErrorDetail::TypeMismatch.message(),
            other.type_name()
        ))),
    }
}

fn exec_if(branches: &[IfBranch], else_branch: Option<&[Stmt]>, interp: &mut Interpreter) -> Result<(), EvalError> {
    for branch in branches {
        if condition(&branch.condition, interp, "if")? {
            return exec_block(&branch.body, interp);
        }
    }
    match else_branch {
        Some(body) => exec_block(body, interp),
        None => Ok(()),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// print
// ═══════════════════════════════════════════════════════════════════════

/// Text `print` produces for a value. Non-negative numbers get a leading
/// space where the sign would go.
pub(crate) fn print_text(value: &Value) -> String {
    let non_negative = match value {
        Value::Int32(n) => *n >= 0,
        Value::Int64(n) => *n >= 0,
        Value::Float(n) => n.is_nan() || *n >= 0.0,
        Value::Double(n) => n.is_nan() || *n >= 0.0,
        _ => false,
    };
    if non_negative {
        format!(" {value}")
    } else {
        value.to_string()
    }
}

fn exec_print(items: &[PrintItem], interp: &mut Interpreter) -> Result<(), EvalError> {
    let mut out = String::new();
    let mut column = interp.column();
    for item in items {
        let text = match item {
            PrintItem::Expr(expr) => print_text(&expr.eval(interp)?),
            PrintItem::Comma => " ".repeat(PRINT_ZONE - column % PRINT_ZONE),
            PrintItem::Semicolon => continue,
        };
        column += text.chars().count();
        out.push_str(&text);
    }
    if !matches!(items.last(), Some(PrintItem::Semicolon)) {
        out.push('\n');
    }
    interp.print(&out);
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// try / catch / throw
// ═══════════════════════════════════════════════════════════════════════

fn exec_try(
    body: &[Stmt],
    catch_var: Option<&str>,
    catch_body: &[Stmt],
    interp: &mut Interpreter,
) -> Result<(), EvalError> {
    match exec_block(body, interp) {
        Err(EvalError::Runtime(err)) => {
            debug!(code = err.code, "caught runtime error");
            if let Some(name) = catch_var {
                interp.env_mut().define(name, error_object(&err));
            }
            exec_block(catch_body, interp)
        }
        other => other,
    }
}

/// The value bound to a `catch` variable.
fn error_object(err: &RuntimeError) -> Value {
    assoc_array::new_value(vec![
        ("message".to_string(), Value::from(err.message.as_str())),
        ("number".to_string(), Value::Int32(err.code)),
        ("rethrown".to_string(), Value::Bool(false)),
    ])
}

/// Build the error raised by `throw value`.
///
/// A string becomes the message of a user-defined error. An associative
/// array may set `number` (an Integer) and `message` (a String); other
/// keys are ignored.
fn thrown(value: Value) -> RuntimeError {
    let malformed = |message: &str| RuntimeError::new(RuntimeErrorDetail::MalformedThrow, message);

    let obj = match &value {
        Value::String(s) => return RuntimeError::new(RuntimeErrorDetail::UserDefined, s.as_ref()),
        Value::Object(obj) => obj,
        _ => return malformed("Thrown value neither string nor roAssociativeArray."),
    };
    if let Some(Value::String(s)) = boxed::unbox(obj) {
        return RuntimeError::new(RuntimeErrorDetail::UserDefined, s.as_ref());
    }
    let component = obj.borrow();
    let Some(aa) = component.as_assoc_array() else {
        return malformed("Thrown value neither string nor roAssociativeArray.");
    };

    let code = match aa.get_ci("number") {
        None | Some(Value::Invalid) => None,
        Some(Value::Int32(n)) => Some(*n),
        Some(_) => return malformed("Thrown \"number\" is not an integer."),
    };
    let message = match aa.get_ci("message") {
        None | Some(Value::Invalid) => None,
        Some(Value::String(s)) => Some(s.to_string()),
        Some(_) => return malformed("Thrown \"message\" is not a string."),
    };

    let message = message.unwrap_or_else(|| match code {
        Some(code) => RuntimeErrorDetail::from_code(code)
            .map(|d| d.message().to_string())
            .unwrap_or_else(|| "UNKNOWN ERROR".to_string()),
        None => String::new(),
    });
    let mut err = RuntimeError::new(RuntimeErrorDetail::UserDefined, message);
    if let Some(code) = code {
        err.code = code;
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CaptureSink;
    use crate::BriskError;
    use pretty_assertions::assert_eq;

    fn output(source: &str) -> String {
        let sink = CaptureSink::new();
        let mut interp = Interpreter::new().with_output(sink.clone());
        interp.eval_source("test.brs", source).unwrap();
        sink.printed()
    }

    fn failure(source: &str) -> RuntimeError {
        let mut interp = Interpreter::new().with_output(CaptureSink::new());
        match interp.eval_source("test.brs", source) {
            Err(BriskError::Runtime(err)) => err,
            other => panic!("expected a runtime error, got {other:?}"),
        }
    }

    #[test]
    fn test_print_separators() {
        assert_eq!(output("print \"a\"; \"b\""), "ab\n");
        assert_eq!(output("print 1; -2"), " 1-2\n");
        assert_eq!(output("print \"x\";"), "x");
    }

    #[test]
    fn test_print_zones() {
        assert_eq!(output("print \"ab\", \"c\""), format!("ab{}c\n", " ".repeat(14)));
    }

    #[test]
    fn test_print_zone_continues_across_statements() {
        let text = output("print \"ab\";\nprint \"c\", \"d\"");
        assert_eq!(text, format!("abc{}d\n", " ".repeat(13)));
    }

    #[test]
    fn test_print_values() {
        assert_eq!(output("print true, invalid"), format!("true{}invalid\n", " ".repeat(12)));
        assert_eq!(output("print 2.5"), " 2.5\n");
    }

    #[test]
    fn test_if_else_chain() {
        let src = "x = 5\nif x > 10 then\n  print \"big\"\nelse if x > 3 then\n  print \"mid\"\nelse\n  print \"small\"\nend if\n";
        assert_eq!(output(src), "mid\n");
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let err = failure("if 1 then print \"yes\"");
        assert_eq!(err.detail, RuntimeErrorDetail::TypeMismatch);
    }

    #[test]
    fn test_try_catches_runtime_errors() {
        let src = "try\n  x = 1 \\ 0\ncatch e\n  print e.number; \" \"; e.message\nend try\n";
        assert_eq!(output(src), " 20 Divide by Zero.\n");
    }

    #[test]
    fn test_throw_string() {
        let src = "try\n  throw \"boom\"\ncatch e\n  print e.message; e.number\nend try\n";
        assert_eq!(output(src), "boom 40\n");
    }

    #[test]
    fn test_throw_assoc_array() {
        let src = "try\n  throw {number: 500, message: \"custom\"}\ncatch err\n  print err.number; err.message\nend try\n";
        assert_eq!(output(src), " 500custom\n");
    }

    #[test]
    fn test_throw_known_code_without_message() {
        let src = "try\n  throw {number: 20}\ncatch err\n  print err.message\nend try\n";
        assert_eq!(output(src), "Divide by Zero.\n");
    }

    #[test]
    fn test_malformed_throw() {
        let err = failure("throw 42");
        assert_eq!(err.detail, RuntimeErrorDetail::MalformedThrow);
        let err = failure("throw {number: \"x\"}");
        assert_eq!(err.message, "Thrown \"number\" is not an integer.");
    }

    #[test]
    fn test_uncaught_throw_keeps_location() {
        let err = failure("x = 1\nthrow \"bad\"");
        assert_eq!(err.code, 40);
        assert_eq!(err.location.map(|l| l.line), Some(2));
    }

    #[test]
    fn test_stop_is_ignored() {
        assert_eq!(output("stop\nprint \"after\""), "after\n");
    }
}
