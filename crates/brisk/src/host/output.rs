//! Destinations for program output

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use super::HostMessage;

/// Receives every message the interpreter emits.
pub trait OutputSink {
    fn send(&mut self, message: HostMessage);
}

/// Prints to the process's stdout; warnings and errors go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn send(&mut self, message: HostMessage) {
        match message {
            HostMessage::Print(text) => {
                let mut out = io::stdout().lock();
                // A closed stdout is not the program's failure
                let _ = out.write_all(text.as_bytes()).and_then(|_| out.flush());
            }
            HostMessage::Warning(text) => eprintln!("WARNING: {text}"),
            HostMessage::Error(text) => eprintln!("{text}"),
            HostMessage::Reset => tracing::info!("program requested a reset"),
            HostMessage::Other { tag, content } => tracing::debug!(%tag, %content, "unhandled message"),
        }
    }
}

/// Collects messages in memory. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    messages: Arc<Mutex<Vec<HostMessage>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<HostMessage> {
        self.messages.lock().clone()
    }

    /// Everything printed so far, concatenated.
    pub fn printed(&self) -> String {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                HostMessage::Print(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                HostMessage::Warning(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl OutputSink for CaptureSink {
    fn send(&mut self, message: HostMessage) {
        self.messages.lock().push(message);
    }
}

/// Forwards each message to a closure.
pub struct FnSink<F>(pub F);

impl<F: FnMut(HostMessage)> OutputSink for FnSink<F> {
    fn send(&mut self, message: HostMessage) {
        (self.0)(message)
    }
}
