//! Program evaluation
//!
//! The [`Interpreter`] walks the syntax tree produced by the parser. Each
//! expression kind lives in its own module; statements and loops are
//! executed by [`stmt`] and [`loops`].

pub mod assign;
pub mod binary;
pub mod call;
pub mod control;
pub mod field;
pub mod function;
pub mod index;
pub mod literal;
pub mod loops;
pub mod stmt;
pub mod unary;

pub use control::{ControlFlow, LoopKind};
pub use stmt::{exec_block, exec_stmt};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::ast::{Expr, Program, StmtKind};
use crate::config::EngineConfig;
use crate::error::{BriskError, RuntimeErrorDetail};
use crate::host::{HostMessage, OutputSink, StdoutSink};
use crate::parser;
use crate::scenegraph::{Callback, FieldEvent, NodeTypeRegistry, ObserverSink};
use crate::{Environment, EvalContext, EvalError, Value};

/// Trait for evaluating AST nodes to values.
///
/// This is the core abstraction for the tree-walking interpreter. Every
/// expression node implements it; statements are executed, not evaluated.
pub trait Evaluate {
    /// Evaluate this AST node against the interpreter's current frame.
    fn eval(&self, interp: &mut Interpreter) -> Result<Value, EvalError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Main Expression Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for Expr {
    fn eval(&self, interp: &mut Interpreter) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(lit) => Ok(literal::eval_literal(lit)),
            Expr::Variable(name) => lookup(interp, name),
            Expr::Grouping(inner) => inner.eval(interp),
            Expr::Binary { left, op, right } => binary::eval_binary(left, *op, right, interp),
            Expr::Unary { op, operand } => unary::eval_unary(*op, operand, interp),
            Expr::Call { callee, args } => call::eval_call(callee, args, interp),
            Expr::DottedGet { object, name } => field::eval_dotted_get(object, name, interp),
            Expr::IndexedGet { object, index } => index::eval_indexed_get(object, index, interp),
            Expr::ArrayLiteral(elements) => literal::eval_array(elements, interp),
            Expr::AssocArrayLiteral(entries) => literal::eval_assoc_array(entries, interp),
            Expr::Function(decl) => Ok(function::eval_function_expr(decl)),
        }
    }
}

fn lookup(interp: &Interpreter, name: &str) -> Result<Value, EvalError> {
    interp.env().get(name).cloned().ok_or_else(|| uninitialized(name))
}

pub(crate) fn uninitialized(name: &str) -> EvalError {
    EvalError::runtime(
        RuntimeErrorDetail::UninitializedVariable,
        format!("{} '{name}'", RuntimeErrorDetail::UninitializedVariable.message()),
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Interpreter
// ═══════════════════════════════════════════════════════════════════════

/// A single-threaded program runner.
///
/// Owns the environment, the evaluation context and where printed output
/// goes. The node type registry is shared so several interpreters (or an
/// interpreter and its host) see the same registrations.
pub struct Interpreter {
    env: Environment,
    ctx: EvalContext,
    output: Box<dyn OutputSink>,
    node_types: Arc<NodeTypeRegistry>,
    dev_mode: bool,
    entry_points: Vec<String>,
    constants: HashMap<String, bool>,

    /// Output column, for `,` print zones
    column: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter with default configuration, printing to stdout.
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let mut env = Environment::with_max_call_depth(config.max_call_depth);
        env.load_prelude();
        Self {
            env,
            ctx: EvalContext::from_config(config),
            output: Box::new(StdoutSink),
            node_types: Arc::new(NodeTypeRegistry::new()),
            dev_mode: config.dev_mode,
            entry_points: config.entry_points.clone(),
            constants: config.constants(),
            column: 0,
        }
    }

    /// Send printed output and warnings to `sink`.
    pub fn with_output(mut self, sink: impl OutputSink + 'static) -> Self {
        self.output = Box::new(sink);
        self
    }

    pub fn with_context(mut self, ctx: EvalContext) -> Self {
        self.env.set_max_call_depth(ctx.max_call_depth);
        self.ctx = ctx;
        self
    }

    pub fn with_node_types(mut self, registry: Arc<NodeTypeRegistry>) -> Self {
        self.node_types = registry;
        self
    }

    pub fn with_dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn ctx(&self) -> &EvalContext {
        &self.ctx
    }

    pub fn node_types(&self) -> &NodeTypeRegistry {
        &self.node_types
    }

    // ═══════════════════════════════════════════════════════════════════
    // Output
    // ═══════════════════════════════════════════════════════════════════

    pub fn emit(&mut self, message: HostMessage) {
        self.output.send(message);
    }

    /// Write program output, keeping track of the output column.
    pub fn print(&mut self, text: &str) {
        match text.rfind('\n') {
            Some(pos) => self.column = text[pos + 1..].chars().count(),
            None => self.column += text.chars().count(),
        }
        self.output.send(HostMessage::Print(text.to_string()));
    }

    pub(crate) fn column(&self) -> usize {
        self.column
    }

    /// Report a recoverable problem. Always logged; forwarded to the host
    /// only in dev mode.
    pub fn warn(&mut self, message: &str) {
        warn!("{message}");
        if self.dev_mode {
            self.output.send(HostMessage::Warning(message.to_string()));
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Programs
    // ═══════════════════════════════════════════════════════════════════

    /// Lex, preprocess and parse `source` with this interpreter's
    /// conditional compilation constants.
    pub fn parse(&self, file: &str, source: &str) -> Result<Program, BriskError> {
        let result = parser::parse_source(file, source, &self.constants);
        if result.is_ok() {
            Ok(result.program)
        } else {
            Err(BriskError::Syntax(result.errors))
        }
    }

    /// Register the program's named functions.
    pub fn load(&mut self, program: &Program) -> Result<(), EvalError> {
        function::hoist_functions(self, program)
    }

    /// Run the top-level statements of a program whose functions are
    /// already loaded. Function declarations are skipped.
    pub fn exec(&mut self, program: &Program) -> Result<(), EvalError> {
        for stmt in &program.statements {
            if matches!(stmt.kind, StmtKind::Function(_)) {
                continue;
            }
            exec_stmt(stmt, self)?;
        }
        Ok(())
    }

    /// Load a program, run its top-level statements, then call the first
    /// entry point it defines. An entry point that takes a parameter
    /// receives an empty associative array.
    ///
    /// `end` stops the program without an error.
    #[tracing::instrument(skip_all)]
    pub fn run(&mut self, program: &Program) -> Result<Value, EvalError> {
        let result = self.run_inner(program);
        match result {
            Err(EvalError::End) => {
                debug!("program ended");
                Ok(Value::Invalid)
            }
            Err(EvalError::ControlFlow(ControlFlow::Return { value })) => Ok(value),
            Err(EvalError::ControlFlow(flow)) => Err(EvalError::Runtime(flow.into_error())),
            other => other,
        }
    }

    fn run_inner(&mut self, program: &Program) -> Result<Value, EvalError> {
        self.load(program)?;
        self.exec(program)?;

        let entry = self
            .entry_points
            .iter()
            .find_map(|name| self.env.function(name));
        let Some(entry) = entry else {
            debug!("no entry point defined");
            return Ok(Value::Invalid);
        };
        debug!(name = %entry.name(), "calling entry point");
        let args = if entry.callable.signature.params.is_empty() {
            Vec::new()
        } else {
            vec![crate::component::assoc_array::new_value(Vec::new())]
        };
        self.call_function(&entry, args)
    }

    /// Parse and execute `source` as a sequence of statements, as the REPL
    /// does. Functions it declares stay defined for later calls.
    pub fn eval_source(&mut self, file: &str, source: &str) -> Result<(), BriskError> {
        let program = self.parse(file, source)?;
        self.load(&program)?;
        match self.exec(&program) {
            Ok(()) | Err(EvalError::End) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Parse `source` and [`run`](Self::run) it.
    pub fn run_source(&mut self, file: &str, source: &str) -> Result<Value, BriskError> {
        let program = self.parse(file, source)?;
        Ok(self.run(&program)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Observer Callbacks
// ═══════════════════════════════════════════════════════════════════════

impl ObserverSink for Interpreter {
    fn invoke(&mut self, callback: &Callback, event: &FieldEvent) -> Result<(), EvalError> {
        let function = match callback {
            Callback::Function(f) => f.clone(),
            Callback::Named(name) => match self.env.function(name) {
                Some(f) => f,
                None => {
                    self.warn(&format!(
                        "observer '{name}' for field '{}' is not a defined function",
                        event.field
                    ));
                    return Ok(());
                }
            },
        };
        let args = if function.callable.signature.params.is_empty() {
            Vec::new()
        } else {
            vec![call::event_object(event)]
        };
        self.call_function(&function, args).map(drop)
    }
}
