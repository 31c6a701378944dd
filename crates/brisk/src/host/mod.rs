//! Host-side embedding API
//!
//! An [`Engine`] owns a parsed program and runs it on a dedicated
//! execution thread. Everything the program prints, warnings included,
//! reaches the host as [`EngineEvent`]s delivered to subscribers. The host
//! stops a running program through the control buffer; after a run the
//! global `m` is published as JSON in the state buffer.

pub mod message;
pub mod output;

pub use message::{HostCommand, HostMessage};
pub use output::{CaptureSink, FnSink, OutputSink, StdoutSink};

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::ast::Program;
use crate::config::EngineConfig;
use crate::context::{EvalContext, Interrupt};
use crate::error::{BriskError, EvalError};
use crate::eval::Interpreter;
use crate::parser;
use crate::scenegraph::{NodeType, NodeTypeRegistry};
use crate::shared::SharedBuffer;
use crate::value::json::to_json;

/// Lifecycle and output notifications sent to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Source parsed and ready to run
    Loaded,
    /// The execution thread began running the program
    Started,
    /// The program finished, failed or was stopped
    Closed,
    Error,
    /// A [`HostMessage`] in wire form
    Message,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineEvent {
    pub kind: EventKind,

    /// File the event concerns
    pub id: String,

    pub payload: Option<serde_json::Value>,
}

impl EngineEvent {
    fn new(kind: EventKind, id: &str, payload: Option<serde_json::Value>) -> Self {
        Self {
            kind,
            id: id.to_string(),
            payload,
        }
    }

    /// The carried message, for [`EventKind::Message`] events.
    pub fn message(&self) -> Option<HostMessage> {
        match (&self.kind, &self.payload) {
            (EventKind::Message, Some(serde_json::Value::String(text))) => Some(HostMessage::parse(text)),
            _ => None,
        }
    }
}

pub type Subscriber = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

type Subscribers = Arc<DashMap<String, Subscriber>>;

/// Stack for the execution thread; deep script recursion runs on it.
const EXEC_STACK_SIZE: usize = 64 * 1024 * 1024;

fn emit(subscribers: &DashMap<String, Subscriber>, event: &EngineEvent) {
    // Subscribers may (un)subscribe from inside a callback
    let callbacks: Vec<Subscriber> = subscribers.iter().map(|entry| Arc::clone(entry.value())).collect();
    for callback in callbacks {
        callback(event);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════

pub struct Engine {
    config: EngineConfig,
    subscribers: Subscribers,
    node_types: Arc<NodeTypeRegistry>,
    interrupt: Arc<Interrupt>,

    /// Host to execution thread
    control: SharedBuffer,

    /// Execution thread to host
    state: SharedBuffer,

    pending: Option<(String, Program)>,
    worker: Option<JoinHandle<Result<(), BriskError>>>,
}

impl Engine {
    pub fn initialize(config: EngineConfig) -> Self {
        info!(entry_points = ?config.entry_points, dev_mode = config.dev_mode, "engine initialized");
        Self {
            control: SharedBuffer::from_config(&config),
            state: SharedBuffer::from_config(&config),
            config,
            subscribers: Arc::new(DashMap::new()),
            node_types: Arc::new(NodeTypeRegistry::new()),
            interrupt: Arc::new(Interrupt::new()),
            pending: None,
            worker: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════
    // Subscriptions
    // ═══════════════════════════════════════════════════════════════════

    /// Register `callback` under `id`, replacing any earlier one.
    pub fn subscribe(&self, id: &str, callback: impl Fn(&EngineEvent) + Send + Sync + 'static) {
        self.subscribers.insert(id.to_string(), Arc::new(callback));
    }

    pub fn unsubscribe(&self, id: &str) -> bool {
        self.subscribers.remove(id).is_some()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Node Types
    // ═══════════════════════════════════════════════════════════════════

    pub fn add_node_types(&self, types: impl IntoIterator<Item = NodeType>) {
        self.node_types.add_node_types(types);
    }

    pub fn can_resolve_component_type(&self, name: &str) -> bool {
        self.node_types.can_resolve(name)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Execution
    // ═══════════════════════════════════════════════════════════════════

    /// Parse `source`. Syntax errors are reported to subscribers and
    /// returned; nothing runs. With `run_immediately` the program starts
    /// right away, otherwise it waits for [`run`](Self::run).
    #[tracing::instrument(skip(self, source))]
    pub fn execute(&mut self, file: &str, source: &str, run_immediately: bool) -> Result<(), BriskError> {
        let result = parser::parse_source(file, source, &self.config.constants());
        if !result.is_ok() {
            let messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.location, e.message))
                .collect();
            emit(
                &self.subscribers,
                &EngineEvent::new(EventKind::Error, file, Some(serde_json::json!(messages))),
            );
            return Err(BriskError::Syntax(result.errors));
        }
        self.pending = Some((file.to_string(), result.program));
        emit(&self.subscribers, &EngineEvent::new(EventKind::Loaded, file, None));
        if run_immediately {
            self.run()?;
        }
        Ok(())
    }

    /// Start the loaded program on the execution thread.
    ///
    /// # Errors
    ///
    /// Fails if nothing is loaded or a program is still running.
    pub fn run(&mut self) -> Result<(), BriskError> {
        if self.is_running() {
            return Err(BriskError::Engine("a program is already running".to_string()));
        }
        // Collect the outcome of a previous run nobody waited for
        if let Some(previous) = self.worker.take() {
            if previous.join().is_err() {
                warn!("previous execution thread panicked");
            }
        }
        let (file, program) = self
            .pending
            .take()
            .ok_or_else(|| BriskError::Engine("no program loaded".to_string()))?;

        self.interrupt.reset();
        let config = self.config.clone();
        let subscribers = Arc::clone(&self.subscribers);
        let node_types = Arc::clone(&self.node_types);
        let interrupt = Arc::clone(&self.interrupt);
        let control = self.control.clone();
        let state = self.state.clone();

        let handle = thread::Builder::new()
            .name("brisk-exec".to_string())
            .stack_size(EXEC_STACK_SIZE)
            .spawn(move || {
                execute_program(
                    &file,
                    &program,
                    &config,
                    &subscribers,
                    node_types,
                    interrupt,
                    control,
                    &state,
                )
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Ask the running program to stop at its next statement. A program
    /// blocked in `Sleep` wakes up immediately.
    pub fn terminate(&self) {
        if let Err(err) = self.control.store(&HostCommand::Terminate) {
            error!(%err, "failed to post terminate command");
        }
        self.interrupt.request();
    }

    /// Block until the execution thread finishes and return its outcome.
    pub fn wait(&mut self) -> Result<(), BriskError> {
        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BriskError::Engine("execution thread panicked".to_string()))?,
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// The global `m` as of the end of the last run.
    pub fn state(&self) -> Option<serde_json::Value> {
        self.state.load(false).ok().flatten()
    }

    pub fn control(&self) -> &SharedBuffer {
        &self.control
    }

    pub fn state_buffer(&self) -> &SharedBuffer {
        &self.state
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.is_running() {
            self.terminate();
        }
        if let Err(err) = self.wait() {
            debug!(%err, "execution ended with an error during shutdown");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Execution Thread
// ═══════════════════════════════════════════════════════════════════════

#[allow(clippy::too_many_arguments)]
fn execute_program(
    file: &str,
    program: &Program,
    config: &EngineConfig,
    subscribers: &Subscribers,
    node_types: Arc<NodeTypeRegistry>,
    interrupt: Arc<Interrupt>,
    control: SharedBuffer,
    state: &SharedBuffer,
) -> Result<(), BriskError> {
    let forward = {
        let subscribers = Arc::clone(subscribers);
        let id = file.to_string();
        FnSink(move |message: HostMessage| {
            let payload = serde_json::Value::String(message.to_string());
            emit(&subscribers, &EngineEvent::new(EventKind::Message, &id, Some(payload)));
        })
    };
    let ctx = EvalContext::from_config(config)
        .with_interrupt(interrupt)
        .with_control(control);
    let mut interp = Interpreter::from_config(config)
        .with_context(ctx)
        .with_node_types(node_types)
        .with_output(forward);

    emit(subscribers, &EngineEvent::new(EventKind::Started, file, None));
    let result = interp.run(program);
    publish_state(&interp, state);

    let (reason, outcome) = match result {
        Ok(_) => ("finished", Ok(())),
        Err(EvalError::Interrupted) => ("interrupted", Err(BriskError::Interrupted)),
        Err(err) => {
            let err = BriskError::from(err);
            let text = err.to_string();
            error!(file, error = %text, "program failed");
            interp.emit(HostMessage::Error(text.clone()));
            emit(
                subscribers,
                &EngineEvent::new(EventKind::Error, file, Some(serde_json::Value::String(text))),
            );
            ("error", Err(err))
        }
    };
    debug!(file, reason, "execution finished");
    emit(
        subscribers,
        &EngineEvent::new(EventKind::Closed, file, Some(serde_json::json!({ "reason": reason }))),
    );
    outcome
}

/// Store the global `m` as a JSON object. Entries JSON cannot represent
/// (functions, cyclic containers) are left out.
fn publish_state(interp: &Interpreter, state: &SharedBuffer) {
    let snapshot: serde_json::Map<String, serde_json::Value> = {
        let global = interp.env().global_aa().borrow();
        match global.as_assoc_array() {
            Some(aa) => aa
                .entries()
                .filter_map(|(key, value)| to_json(value).ok().map(|json| (key.to_string(), json)))
                .collect(),
            None => serde_json::Map::new(),
        }
    };
    if let Err(err) = state.store(&serde_json::Value::Object(snapshot)) {
        warn!(%err, "state snapshot not published");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn collect(engine: &Engine) -> Arc<Mutex<Vec<EngineEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        engine.subscribe("test", move |event| sink.lock().push(event.clone()));
        events
    }

    #[test]
    fn test_syntax_error_is_reported_not_run() {
        let mut engine = Engine::initialize(EngineConfig::default());
        let events = collect(&engine);
        let err = engine.execute("bad.brs", "if then\n", true).unwrap_err();
        assert!(matches!(err, BriskError::Syntax(_)));
        let kinds: Vec<EventKind> = events.lock().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Error]);
    }

    #[test]
    fn test_run_without_program() {
        let mut engine = Engine::initialize(EngineConfig::default());
        assert!(matches!(engine.run(), Err(BriskError::Engine(_))));
    }

    #[test]
    fn test_event_lifecycle() {
        let mut engine = Engine::initialize(EngineConfig::default());
        let events = collect(&engine);
        engine
            .execute("main.brs", "sub main()\n  print \"hi\"\nend sub\n", true)
            .unwrap();
        engine.wait().unwrap();

        let events = events.lock();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Loaded, EventKind::Started, EventKind::Message, EventKind::Closed]
        );
        assert_eq!(events[2].message(), Some(HostMessage::Print("hi\n".to_string())));
    }

    #[test]
    fn test_unsubscribe() {
        let engine = Engine::initialize(EngineConfig::default());
        engine.subscribe("a", |_| {});
        assert!(engine.unsubscribe("a"));
        assert!(!engine.unsubscribe("a"));
    }

    #[test]
    fn test_state_snapshot() {
        let mut engine = Engine::initialize(EngineConfig::default());
        engine
            .execute("main.brs", "sub main()\n  m.score = 7\n  m.name = \"x\"\nend sub\n", true)
            .unwrap();
        engine.wait().unwrap();
        assert_eq!(engine.state(), Some(serde_json::json!({ "score": 7, "name": "x" })));
    }

    #[test]
    fn test_custom_node_types() {
        let engine = Engine::initialize(EngineConfig::default());
        assert!(!engine.can_resolve_component_type("Widget"));
        engine.add_node_types([NodeType::new("Widget", Some("Group"), |_| {})]);
        assert!(engine.can_resolve_component_type("widget"));
    }
}
