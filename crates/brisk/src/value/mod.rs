//! Value representation for runtime values

mod callable;
mod display;
pub mod format;
mod impls;
pub mod json;
mod kind;

pub use callable::{Callable, CallableBody, FunctionValue, MethodFn, NativeFn, Param, ParamDefault, Signature};
pub use kind::ValueKind;
pub(crate) use callable::coerce_argument;

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::Component;

/// Shared, mutable handle to a component instance.
///
/// Components are reference types: copying a value that holds one copies
/// the handle, not the component.
pub type Object = Rc<RefCell<Component>>;

/// Runtime value representation for the Brisk interpreter.
///
/// Intrinsics (`Invalid` through `Double`) are immutable and copied by
/// value. Components live behind an [`Object`] handle. Functions are
/// first-class and may carry the object they were looked up on, which
/// becomes `m` when they are called.
#[derive(Clone)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Intrinsics
    // ═══════════════════════════════════════════════════════════════════
    /// The absence of a value
    Invalid,

    Bool(bool),

    /// Immutable string; cloning shares the buffer
    String(Rc<str>),

    /// 32-bit integer (`Integer`)
    Int32(i32),

    /// 64-bit integer (`LongInteger`)
    Int64(i64),

    /// Single precision float (`Float`)
    Float(f32),

    /// Double precision float (`Double`)
    Double(f64),

    // ═══════════════════════════════════════════════════════════════════
    // Reference Types
    // ═══════════════════════════════════════════════════════════════════
    /// A callable, optionally bound to a receiver
    Function(FunctionValue),

    /// A component instance
    Object(Object),
}
