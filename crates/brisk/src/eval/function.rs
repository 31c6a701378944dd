//! Function declarations and anonymous function expressions

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use super::Interpreter;
use crate::ast::{FunctionDecl, Program};
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::value::{Callable, FunctionValue};
use crate::Value;

/// `function(...) ... end function` used as a value.
pub fn eval_function_expr(decl: &FunctionDecl) -> Value {
    Value::Function(FunctionValue::new(Rc::new(Callable::user(Rc::new(decl.clone())))))
}

/// Register a named declaration as a global, replacing any earlier one.
pub fn define_function(interp: &mut Interpreter, decl: &FunctionDecl) {
    if decl.name.is_some() {
        let replaced = interp.env_mut().define_function(Callable::user(Rc::new(decl.clone())));
        if replaced {
            debug!(name = ?decl.name, "function redefined");
        }
    }
}

/// Hoist every file-level declaration of `program`. Declaring the same
/// name twice within one program is an error; replacing a function from an
/// earlier program (a REPL line, another file) is not.
pub fn hoist_functions(interp: &mut Interpreter, program: &Program) -> Result<(), EvalError> {
    let mut seen = HashSet::new();
    for decl in program.functions() {
        let Some(name) = &decl.name else { continue };
        if !seen.insert(name.to_lowercase()) {
            return Err(EvalError::runtime(
                RuntimeErrorDetail::DuplicateSub,
                format!("{} '{name}'", RuntimeErrorDetail::DuplicateSub.message()),
            )
            .at(&decl.location));
        }
        define_function(interp, decl);
    }
    Ok(())
}
