//! Runtime environment managing variable and function bindings

mod prelude;

use crate::component::assoc_array;
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::value::{Callable, FunctionValue, Object, Value};

use std::rc::Rc;

/// A single variable or function binding. Names are stored lowercase;
/// identifiers are case-insensitive.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub value: Value,
}

impl Binding {
    fn new(name: &str, value: Value) -> Self {
        Self {
            name: name.to_lowercase(),
            value,
        }
    }
}

/// The runtime environment.
///
/// Locals live in one flat vector split into frames, one frame per active
/// call plus the top-level frame. A function body sees only its own frame
/// and the global table (named functions and builtins); it never sees the
/// caller's locals.
///
/// # Example
///
/// ```
/// use brisk::{Environment, Value};
///
/// let mut env = Environment::new();
/// env.define("X", Value::Int32(1));
///
/// env.push_frame();
/// assert_eq!(env.get("x"), None); // callers' locals are not visible
/// env.define("y", Value::Int32(2));
/// env.pop_frame();
///
/// assert_eq!(env.get("x"), Some(&Value::Int32(1)));
/// assert_eq!(env.get("y"), None);
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    /// Locals of every active frame (most recent at end)
    bindings: Vec<Binding>,

    /// Frame boundaries (indices into bindings)
    frames: Vec<usize>,

    /// Named functions and builtins
    globals: Vec<Binding>,

    /// The global `m`, returned by `GetGlobalAA`
    global_aa: Object,

    /// Current call depth (for recursion limiting)
    call_depth: usize,

    /// Maximum allowed call depth
    max_call_depth: usize,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Create an environment with no builtins.
    pub fn new() -> Self {
        Self::with_max_call_depth(1000)
    }

    /// Create an environment with a custom call depth limit.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        let global_aa = assoc_array::new_object(Vec::new());
        Self {
            bindings: vec![Binding::new("m", Value::Object(Rc::clone(&global_aa)))],
            frames: vec![0],
            globals: Vec::new(),
            global_aa,
            call_depth: 0,
            max_call_depth: max_depth,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Frame Management
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a new function frame.
    pub fn push_frame(&mut self) {
        self.frames.push(self.bindings.len());
    }

    /// Leave the current frame, dropping its locals. The top-level frame
    /// is never popped.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            if let Some(boundary) = self.frames.pop() {
                self.bindings.truncate(boundary);
            }
        }
    }

    /// Get the current scope depth (number of frames).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_global_scope(&self) -> bool {
        self.frames.len() == 1
    }

    fn frame_start(&self) -> usize {
        self.frames.last().copied().unwrap_or(0)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Call Depth Tracking (Stack Overflow Protection)
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a function call. Fails with a stack overflow past the limit.
    pub fn enter_call(&mut self) -> Result<(), EvalError> {
        if self.call_depth >= self.max_call_depth {
            return Err(EvalError::runtime(
                RuntimeErrorDetail::StackOverflow,
                format!(
                    "{} Call depth exceeded {}",
                    RuntimeErrorDetail::StackOverflow.message(),
                    self.max_call_depth
                ),
            ));
        }
        self.call_depth += 1;
        Ok(())
    }

    pub fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    // ═══════════════════════════════════════════════════════════════════
    // Binding Definition
    // ═══════════════════════════════════════════════════════════════════

    /// Assign `name` in the current frame, creating the local if needed.
    pub fn define(&mut self, name: &str, value: Value) {
        let start = self.frame_start();
        let key = name.to_lowercase();
        match self.bindings[start..].iter_mut().find(|b| b.name == key) {
            Some(binding) => binding.value = value,
            None => self.bindings.push(Binding { name: key, value }),
        }
    }

    /// Define or replace a global. Returns `true` if a global of that name
    /// already existed.
    pub fn define_global(&mut self, name: &str, value: Value) -> bool {
        let key = name.to_lowercase();
        match self.globals.iter_mut().find(|b| b.name == key) {
            Some(binding) => {
                binding.value = value;
                true
            }
            None => {
                self.globals.push(Binding { name: key, value });
                false
            }
        }
    }

    /// Register a callable as a global function.
    pub fn define_function(&mut self, callable: Callable) -> bool {
        let name = callable.name.clone();
        self.define_global(&name, Value::Function(FunctionValue::new(Rc::new(callable))))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Binding Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Look up `name` in the current frame, then among the globals.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let key = name.to_lowercase();
        let start = self.frame_start();
        self.bindings[start..]
            .iter()
            .find(|b| b.name == key)
            .or_else(|| self.globals.iter().find(|b| b.name == key))
            .map(|b| &b.value)
    }

    pub fn get_global(&self, name: &str) -> Option<&Value> {
        let key = name.to_lowercase();
        self.globals.iter().find(|b| b.name == key).map(|b| &b.value)
    }

    /// A global function by name.
    pub fn function(&self, name: &str) -> Option<FunctionValue> {
        self.get_global(name).and_then(Value::as_function).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn contains_in_current_scope(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        self.bindings[self.frame_start()..].iter().any(|b| b.name == key)
    }

    /// `m` of the running function, or the global AA at top level.
    pub fn m(&self) -> Object {
        match self.bindings[self.frame_start()..].iter().find(|b| b.name == "m") {
            Some(Binding {
                value: Value::Object(obj),
                ..
            }) => Rc::clone(obj),
            _ => Rc::clone(&self.global_aa),
        }
    }

    pub fn global_aa(&self) -> &Object {
        &self.global_aa
    }

    // ═══════════════════════════════════════════════════════════════════
    // Iteration and Inspection
    // ═══════════════════════════════════════════════════════════════════

    pub fn names_in_current_scope(&self) -> Vec<&str> {
        self.bindings[self.frame_start()..]
            .iter()
            .map(|b| b.name.as_str())
            .collect()
    }

    /// Names of all globals (for completion).
    pub fn global_names(&self) -> Vec<&str> {
        self.globals.iter().map(|b| b.name.as_str()).collect()
    }

    /// Drop every local and user-defined global, keeping builtins and a
    /// fresh global AA.
    pub fn clear(&mut self) {
        self.globals.retain(|b| match &b.value {
            Value::Function(f) => !matches!(f.callable.body, crate::value::CallableBody::User(_)),
            _ => false,
        });
        self.global_aa = assoc_array::new_object(Vec::new());
        self.bindings = vec![Binding::new("m", Value::Object(Rc::clone(&self.global_aa)))];
        self.frames = vec![0];
        self.call_depth = 0;
    }
}
