//! # Brisk
//!
//! A headless interpreter for a BASIC-derived scripting language, with a
//! retained scene graph of observable nodes.
//!
//! ## Architecture
//!
//! - **Lexer / Parser**: source text to tokens to a [`Program`], with
//!   conditional compilation resolved on the way
//! - **Interpreter**: walks the tree against a frame-per-call environment
//! - **Components**: associative arrays, arrays, boxed intrinsics and nodes,
//!   all dispatched through named interfaces
//! - **Scene graph**: typed node fields with permanent and one-shot
//!   observers and a notification protocol that survives cycles
//! - **Host**: an [`Engine`] that runs programs on an execution thread and
//!   talks to it through [`SharedBuffer`]s
//!
//! ## Example
//!
//! ```
//! use brisk::{CaptureSink, Interpreter};
//!
//! let sink = CaptureSink::new();
//! let mut interp = Interpreter::new().with_output(sink.clone());
//! interp
//!     .run_source("main.brs", "sub main()\n  print \"hello\"\nend sub\n")
//!     .unwrap();
//! assert_eq!(sink.printed(), "hello\n");
//! ```

#![warn(clippy::all)]

pub mod ast;
pub mod component;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod eval;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod scenegraph;
pub mod shared;
pub mod value;

// Re-export main types
pub use ast::Program;
pub use config::EngineConfig;
pub use context::{EvalContext, Interrupt};
pub use environment::{Binding, Environment};
pub use error::{BriskError, EvalError, Result, RuntimeError, RuntimeErrorDetail, SyntaxError};
pub use eval::{ControlFlow, Evaluate, Interpreter};
pub use host::{CaptureSink, Engine, EngineEvent, EventKind, HostCommand, HostMessage, OutputSink};
pub use shared::{SharedBuffer, WaitOutcome};
pub use value::{Callable, FunctionValue, Object, Value, ValueKind};

/// Brisk version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
