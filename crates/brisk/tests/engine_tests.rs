//! Host engine tests: lifecycle events, termination, error reporting and
//! the message wire format

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use brisk::*;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

fn collect(engine: &Engine) -> Arc<Mutex<Vec<EngineEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.subscribe("test", move |event| sink.lock().push(event.clone()));
    events
}

fn kinds(events: &Mutex<Vec<EngineEvent>>) -> Vec<EventKind> {
    events.lock().iter().map(|e| e.kind).collect()
}

/// Block until an event of `kind` arrives or `timeout` passes.
fn wait_for(events: &Mutex<Vec<EngineEvent>>, kind: EventKind, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if events.lock().iter().any(|e| e.kind == kind) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn closed_reason(events: &Mutex<Vec<EngineEvent>>) -> Option<serde_json::Value> {
    events
        .lock()
        .iter()
        .find(|e| e.kind == EventKind::Closed)
        .and_then(|e| e.payload.clone())
}

// ═══════════════════════════════════════════════════════════════════════
// Lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_deferred_run() {
    let mut engine = Engine::initialize(EngineConfig::default());
    let events = collect(&engine);
    engine
        .execute("main.brs", "sub main()\n    print 1; 2\nend sub\n", false)
        .unwrap();
    assert_eq!(kinds(&events), vec![EventKind::Loaded]);

    engine.run().unwrap();
    engine.wait().unwrap();
    assert!(!engine.is_running());

    let printed: Vec<HostMessage> = events.lock().iter().filter_map(EngineEvent::message).collect();
    assert_eq!(printed, vec![HostMessage::Print(" 1 2\n".to_string())]);
    assert_eq!(closed_reason(&events), Some(json!({ "reason": "finished" })));
}

#[test]
fn test_run_twice_needs_a_new_program() {
    let mut engine = Engine::initialize(EngineConfig::default());
    engine.execute("main.brs", "sub main()\nend sub\n", true).unwrap();
    engine.wait().unwrap();
    assert!(matches!(engine.run(), Err(BriskError::Engine(_))));
}

#[test]
fn test_every_subscriber_sees_events() {
    let mut engine = Engine::initialize(EngineConfig::default());
    let first = collect(&engine);
    let second = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&second);
    engine.subscribe("other", move |event: &EngineEvent| sink.lock().push(event.kind));

    engine.execute("main.brs", "sub main()\nend sub\n", true).unwrap();
    engine.wait().unwrap();
    assert_eq!(kinds(&first), *second.lock());
}

// ═══════════════════════════════════════════════════════════════════════
// Termination
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_terminate_wakes_a_sleeping_program() {
    let mut engine = Engine::initialize(EngineConfig::default());
    let events = collect(&engine);
    let src = "sub main()\n    print \"start\"\n    Sleep(60000)\n    print \"late\"\nend sub\n";
    engine.execute("sleepy.brs", src, true).unwrap();
    assert!(wait_for(&events, EventKind::Message, Duration::from_secs(5)));

    let started = Instant::now();
    engine.terminate();
    let result = engine.wait();
    assert!(matches!(result, Err(BriskError::Interrupted)));
    assert!(started.elapsed() < Duration::from_secs(10));

    let printed: String = events
        .lock()
        .iter()
        .filter_map(EngineEvent::message)
        .map(|m| m.content().to_string())
        .collect();
    assert_eq!(printed, "start\n");
    assert_eq!(closed_reason(&events), Some(json!({ "reason": "interrupted" })));
}

#[test]
fn test_terminate_stops_a_busy_loop() {
    let mut engine = Engine::initialize(EngineConfig::default());
    let events = collect(&engine);
    engine
        .execute("spin.brs", "sub main()\n    n = 0\n    while true\n        n = n + 1\n    end while\nend sub\n", true)
        .unwrap();
    assert!(wait_for(&events, EventKind::Started, Duration::from_secs(5)));
    engine.terminate();
    assert!(matches!(engine.wait(), Err(BriskError::Interrupted)));
    assert!(kinds(&events).ends_with(&[EventKind::Closed]));
}

#[test]
fn test_terminate_command_is_posted_on_control_buffer() {
    let mut engine = Engine::initialize(EngineConfig::default());
    let before = engine.control().version();
    engine.terminate();
    assert_eq!(engine.control().version(), before + 1);
    assert_eq!(
        engine.control().load::<HostCommand>(false).unwrap(),
        Some(HostCommand::Terminate)
    );
    assert!(engine.wait().is_ok());
}

// ═══════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_runtime_error_is_reported() {
    let mut engine = Engine::initialize(EngineConfig::default());
    let events = collect(&engine);
    engine
        .execute("crash.brs", "sub main()\n    print \"a\"\n    x = 1 / 0\n    print \"b\"\nend sub\n", true)
        .unwrap();
    match engine.wait() {
        Err(BriskError::Runtime(err)) => assert_eq!(err.detail, RuntimeErrorDetail::DivideByZero),
        other => panic!("expected a runtime error, got {other:?}"),
    }

    let events = events.lock();
    let error = events.iter().find(|e| e.kind == EventKind::Error).unwrap();
    let text = error.payload.as_ref().and_then(|p| p.as_str()).unwrap();
    assert!(text.contains("Divide by Zero."));
    assert!(text.contains("crash.brs(3,"));

    let messages: Vec<HostMessage> = events.iter().filter_map(EngineEvent::message).collect();
    assert_eq!(messages[0], HostMessage::Print("a\n".to_string()));
    assert!(matches!(&messages[1], HostMessage::Error(text) if text.contains("Divide by Zero.")));
    assert_eq!(messages.len(), 2);
}

#[test]
fn test_syntax_errors_are_listed_in_payload() {
    let mut engine = Engine::initialize(EngineConfig::default());
    let events = collect(&engine);
    let err = engine.execute("bad.brs", "x = = 1\ny = )\n", true).unwrap_err();
    let BriskError::Syntax(errors) = err else {
        panic!("expected syntax errors");
    };
    assert_eq!(errors.len(), 2);

    let events = events.lock();
    assert_eq!(events.len(), 1);
    let listed = events[0].payload.as_ref().and_then(|p| p.as_array()).map(Vec::len);
    assert_eq!(listed, Some(2));
    assert!(!engine.is_running());
}

#[test]
fn test_warnings_reach_host_in_dev_mode() {
    let mut engine = Engine::initialize(EngineConfig::default().with_dev_mode(true));
    let events = collect(&engine);
    engine
        .execute("warn.brs", "sub main()\n    x = CreateObject(\"roMissing\")\nend sub\n", true)
        .unwrap();
    engine.wait().unwrap();
    let warnings: Vec<HostMessage> = events
        .lock()
        .iter()
        .filter_map(EngineEvent::message)
        .filter(|m| m.tag() == "warning")
        .collect();
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_registered_node_types_resolve() {
    let engine = Engine::initialize(EngineConfig::default());
    assert!(engine.can_resolve_component_type("label"));
    assert!(!engine.can_resolve_component_type("Poster"));

    engine.add_node_types([brisk::scenegraph::NodeType::new("Poster", Some("Group"), |_| {})]);
    assert!(engine.can_resolve_component_type("Poster"));
}

// ═══════════════════════════════════════════════════════════════════════
// State and Wire Format
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_state_snapshot_skips_functions() {
    let mut engine = Engine::initialize(EngineConfig::default());
    let src = "sub helper()\nend sub\n\nsub main()\n    m.items = [1, \"two\"]\n    m.fn = helper\nend sub\n";
    engine.execute("state.brs", src, true).unwrap();
    engine.wait().unwrap();
    assert_eq!(engine.state(), Some(json!({ "items": [1, "two"] })));
    assert_eq!(engine.state_buffer().version(), 1);
}

#[test]
fn test_message_wire_format() {
    let cases = [
        ("print,hello, world", HostMessage::Print("hello, world".to_string())),
        ("warning,careful", HostMessage::Warning("careful".to_string())),
        ("error,boom", HostMessage::Error("boom".to_string())),
        ("reset", HostMessage::Reset),
    ];
    for (wire, message) in cases {
        assert_eq!(HostMessage::parse(wire), message);
        assert_eq!(message.to_string(), wire);
    }
    let unknown: HostMessage = "debug,step".parse().unwrap();
    assert_eq!(unknown.tag(), "debug");
    assert_eq!(unknown.content(), "step");
}

#[test]
fn test_event_serializes_with_snake_case_kind() {
    let event = EngineEvent {
        kind: EventKind::Closed,
        id: "main.brs".to_string(),
        payload: Some(json!({ "reason": "finished" })),
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({ "kind": "closed", "id": "main.brs", "payload": { "reason": "finished" } })
    );
}
