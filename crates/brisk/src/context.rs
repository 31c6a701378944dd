//! Evaluation context: limits and cooperative cancellation

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::config::EngineConfig;
use crate::host::HostCommand;
use crate::shared::SharedBuffer;

/// Cancellation flag with a wake-up for threads blocked in `sleep`.
#[derive(Debug, Default)]
pub struct Interrupt {
    flag: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake any sleeper.
    pub fn request(&self) {
        self.flag.store(true, Ordering::Release);
        let _guard = self.lock.lock();
        self.wake.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Block until `deadline` or a request. Returns `true` if woken early.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut guard = self.lock.lock();
        if self.is_requested() {
            return true;
        }
        !self.wake.wait_until(&mut guard, deadline).timed_out()
    }
}

/// Configuration and state for evaluation.
///
/// Passed to the interpreter at construction; controls the recursion limit
/// and how the running program learns it should stop.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Maximum call depth (stack overflow protection)
    pub max_call_depth: usize,

    /// Interrupt flag, shared with whoever may stop the program
    pub interrupt: Arc<Interrupt>,

    /// Whether to trace evaluation (for debugging)
    pub trace: bool,

    /// Commands from the host, checked at statement boundaries
    control: Option<SharedBuffer>,
    control_seen: Cell<u32>,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            interrupt: Arc::new(Interrupt::new()),
            trace: false,
            control: None,
            control_seen: Cell::new(0),
        }
    }
}

impl EvalContext {
    /// Create a new context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a custom call depth limit.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            max_call_depth: max_depth,
            ..Default::default()
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            trace: config.trace,
            ..Self::with_max_call_depth(config.max_call_depth)
        }
    }

    /// Share an existing interrupt flag.
    pub fn with_interrupt(mut self, interrupt: Arc<Interrupt>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Read host commands from `buffer`.
    pub fn with_control(mut self, buffer: SharedBuffer) -> Self {
        self.control_seen.set(buffer.version());
        self.control = Some(buffer);
        self
    }

    /// Check if evaluation has been interrupted, picking up any command
    /// the host has posted since the last check.
    pub fn is_interrupted(&self) -> bool {
        self.poll_control();
        self.interrupt.is_requested()
    }

    fn poll_control(&self) {
        let Some(control) = &self.control else {
            return;
        };
        let version = control.version();
        if version == self.control_seen.get() {
            return;
        }
        self.control_seen.set(version);
        match control.load::<HostCommand>(false) {
            Ok(Some(HostCommand::Terminate)) => {
                debug!("terminate command received");
                self.interrupt.request();
            }
            Ok(None) => {}
            // Decode failures are logged by the buffer
            Err(_) => {}
        }
    }

    /// Request interruption of evaluation.
    pub fn interrupt(&self) {
        self.interrupt.request();
    }

    /// Reset the interrupt flag.
    pub fn reset_interrupt(&self) {
        self.interrupt.reset();
    }

    /// Suspend the calling thread for `duration`. Returns `true` if the
    /// sleep was cut short by an interrupt.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_interrupted() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            self.interrupt.wait_until(deadline);
        }
    }
}
