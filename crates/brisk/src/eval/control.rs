//! Control flow mechanism for `return`, `exit` and `continue`

use crate::error::{RuntimeError, RuntimeErrorDetail};
use crate::Value;

/// Which loop construct a loop-control statement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    While,
}

/// Control flow signal for non-local jumps.
///
/// Evaluating `exit for` or `return` does not produce a value. It returns
/// `Err(EvalError::ControlFlow(..))`, which unwinds until the loop or
/// function that owns it catches it.
#[derive(Debug, Clone)]
pub enum ControlFlow {
    /// Leave the innermost loop of the given kind.
    Exit(LoopKind),

    /// Skip to the next iteration of the innermost loop of the given kind.
    Continue(LoopKind),

    /// Return from the current function.
    Return { value: Value },
}

impl ControlFlow {
    pub fn return_value(value: Value) -> Self {
        ControlFlow::Return { value }
    }

    /// Whether a loop of `kind` should handle this signal.
    pub fn matches_loop(&self, kind: LoopKind) -> bool {
        match self {
            ControlFlow::Exit(k) | ControlFlow::Continue(k) => *k == kind,
            ControlFlow::Return { .. } => false,
        }
    }

    /// The error reported when a signal escapes every construct that
    /// could have handled it.
    pub fn into_error(self) -> RuntimeError {
        let detail = match self {
            ControlFlow::Exit(LoopKind::For) => RuntimeErrorDetail::ExitForWithoutFor,
            ControlFlow::Exit(LoopKind::While) => RuntimeErrorDetail::ExitWhileWithoutWhile,
            ControlFlow::Continue(LoopKind::For) => RuntimeErrorDetail::ContinueForWithoutFor,
            ControlFlow::Continue(LoopKind::While) => RuntimeErrorDetail::ContinueWhileWithoutWhile,
            ControlFlow::Return { .. } => RuntimeErrorDetail::Internal,
        };
        RuntimeError::from_detail(detail)
    }
}

impl PartialEq for ControlFlow {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ControlFlow::Exit(a), ControlFlow::Exit(b)) => a == b,
            (ControlFlow::Continue(a), ControlFlow::Continue(b)) => a == b,
            (ControlFlow::Return { value: a }, ControlFlow::Return { value: b }) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_loop() {
        assert!(ControlFlow::Exit(LoopKind::For).matches_loop(LoopKind::For));
        assert!(!ControlFlow::Exit(LoopKind::For).matches_loop(LoopKind::While));
        assert!(ControlFlow::Continue(LoopKind::While).matches_loop(LoopKind::While));
        assert!(!ControlFlow::return_value(Value::Int32(1)).matches_loop(LoopKind::For));
    }

    #[test]
    fn test_escaped_signal_codes() {
        assert_eq!(ControlFlow::Exit(LoopKind::For).into_error().code, 165);
        assert_eq!(ControlFlow::Exit(LoopKind::While).into_error().code, 175);
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            ControlFlow::return_value(Value::Int32(1)),
            ControlFlow::return_value(Value::Int32(1))
        );
        assert_ne!(ControlFlow::Exit(LoopKind::For), ControlFlow::Continue(LoopKind::For));
    }
}
