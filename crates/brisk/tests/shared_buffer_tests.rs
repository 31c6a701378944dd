//! Tests for the shared state channel between host and execution thread

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use brisk::shared::HEADER_SIZE;
use brisk::{SharedBuffer, WaitOutcome};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};

// ═══════════════════════════════════════════════════════════════════════
// Round Trip
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_store_then_load() {
    let buffer = SharedBuffer::new(64, 4096);
    let version = buffer.store(&json!({"foo": "bar", "count": 7})).unwrap();
    assert_eq!(version, 1);
    assert_eq!(buffer.version(), 1);
    assert_eq!(
        buffer.load::<Json>(false).unwrap(),
        Some(json!({"foo": "bar", "count": 7}))
    );
}

#[test]
fn test_load_with_reset_clears_version() {
    let buffer = SharedBuffer::new(64, 4096);
    buffer.store(&json!({"foo": "bar", "count": 7})).unwrap();
    assert_eq!(
        buffer.load::<Json>(true).unwrap(),
        Some(json!({"foo": "bar", "count": 7}))
    );
    assert_eq!(buffer.version(), 0);
}

#[test]
fn test_every_store_bumps_version() {
    let buffer = SharedBuffer::new(64, 4096);
    for expected in 1..=5 {
        assert_eq!(buffer.store(&expected).unwrap(), expected);
    }
    assert_eq!(buffer.load::<u32>(false).unwrap(), Some(5));
}

#[test]
fn test_raw_bytes() {
    let buffer = SharedBuffer::new(64, 4096);
    buffer.store_data(b"\x00\x01\x02").unwrap();
    assert_eq!(buffer.load_data(false), Some(vec![0, 1, 2]));
}

// ═══════════════════════════════════════════════════════════════════════
// Growth
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_large_store_grows_buffer() {
    let buffer = SharedBuffer::new(32, 1 << 20);
    let payload = "x".repeat(5000);
    buffer.store(&payload).unwrap();
    let encoded_len = payload.len() + 2;
    assert!(buffer.byte_len() >= encoded_len + HEADER_SIZE);
    assert_eq!(buffer.load::<String>(false).unwrap(), Some(payload));
}

#[test]
fn test_growth_is_visible_through_rebound_handle() {
    let host = SharedBuffer::new(32, 1 << 16);
    let mut worker = SharedBuffer::new(32, 1 << 16);
    worker.set_buffer(host.buffer());
    worker.store(&"y".repeat(1000)).unwrap();
    assert!(host.byte_len() >= 1000 + HEADER_SIZE);
    assert_eq!(host.load::<String>(false).unwrap().map(|s| s.len()), Some(1000));
}

// ═══════════════════════════════════════════════════════════════════════
// waitStore
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_wait_store_when_version_already_moved() {
    let buffer = SharedBuffer::new(64, 4096);
    buffer.store(&"first").unwrap();

    let started = Instant::now();
    let outcome = buffer.wait_store(&"second", 0, Duration::from_secs(5)).unwrap();
    assert_eq!(outcome, WaitOutcome::NotEqual);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(buffer.version(), 2);
    assert_eq!(buffer.load::<String>(false).unwrap().as_deref(), Some("second"));
}

#[test]
fn test_wait_store_times_out_then_stores_once() {
    let buffer = SharedBuffer::new(64, 4096);
    let outcome = buffer.wait_store(&"late", 0, Duration::from_millis(20)).unwrap();
    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert_eq!(buffer.version(), 1);
    assert_eq!(buffer.load::<String>(false).unwrap().as_deref(), Some("late"));
}

#[test]
fn test_wait_store_wakes_on_other_thread_store() {
    let buffer = SharedBuffer::new(64, 4096);
    let other = buffer.clone();
    let (ready_tx, ready_rx) = mpsc::channel();

    let waiter = thread::spawn(move || {
        ready_tx.send(()).unwrap();
        other.wait_store(&"reply", 0, Duration::from_secs(10)).unwrap()
    });
    ready_rx.recv().unwrap();
    thread::sleep(Duration::from_millis(20));
    buffer.store(&"request").unwrap();

    let outcome = waiter.join().unwrap();
    assert!(matches!(outcome, WaitOutcome::Ok | WaitOutcome::NotEqual));
    assert_eq!(buffer.version(), 2);
    assert_eq!(buffer.load::<String>(false).unwrap().as_deref(), Some("reply"));
}

#[test]
fn test_decode_failure_does_not_panic() {
    let buffer = SharedBuffer::new(64, 4096);
    buffer.store_data(b"\xff\xfe").unwrap();
    assert!(buffer.load::<Json>(false).is_err());
    assert_eq!(buffer.load_data(false), Some(vec![0xff, 0xfe]));
}
