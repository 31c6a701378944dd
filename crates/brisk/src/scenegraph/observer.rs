//! Field observers and the sink that runs script callbacks

use std::fmt;
use std::rc::Rc;

use crate::error::EvalError;
use crate::value::{FunctionValue, Object, Value};

/// A change delivered to observers.
#[derive(Clone)]
pub struct FieldEvent {
    /// The node whose field changed
    pub node: Object,

    /// Field name as declared
    pub field: String,

    /// The field's value at notification time
    pub data: Value,
}

impl fmt::Debug for FieldEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldEvent")
            .field("field", &self.field)
            .field("data", &self.data)
            .finish()
    }
}

/// Script-side callback target.
#[derive(Clone, Debug)]
pub enum Callback {
    /// A function looked up by name when the observer fires
    Named(String),

    /// A function value captured at registration
    Function(FunctionValue),
}

/// Rust-side observer, used by the host and in tests.
pub type NativeObserver = Rc<dyn Fn(&FieldEvent) -> Result<(), EvalError>>;

/// Something to run when a field changes.
#[derive(Clone)]
pub enum Observer {
    Script(Callback),
    Native(NativeObserver),
}

impl Observer {
    pub fn named(function: &str) -> Self {
        Observer::Script(Callback::Named(function.to_string()))
    }

    pub fn native(f: impl Fn(&FieldEvent) -> Result<(), EvalError> + 'static) -> Self {
        Observer::Native(Rc::new(f))
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observer::Script(callback) => write!(f, "Script({callback:?})"),
            Observer::Native(_) => f.write_str("Native"),
        }
    }
}

/// Runs script callbacks on behalf of the field protocol. The interpreter
/// is the real sink; native observers never reach it.
pub trait ObserverSink {
    fn invoke(&mut self, callback: &Callback, event: &FieldEvent) -> Result<(), EvalError>;
}

/// A sink for node trees driven from Rust alone. Script callbacks are
/// skipped.
#[derive(Debug, Default)]
pub struct NativeSink;

impl ObserverSink for NativeSink {
    fn invoke(&mut self, callback: &Callback, event: &FieldEvent) -> Result<(), EvalError> {
        tracing::trace!(?callback, field = %event.field, "no interpreter; script observer skipped");
        Ok(())
    }
}
