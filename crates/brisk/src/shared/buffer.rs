//! Growable, versioned byte region shared between threads
//!
//! Layout, all slots little-endian 32-bit:
//!
//! ```text
//! [0, 4)        payload length
//! [4, 8)        version, +1 per store
//! [8, 8 + len)  payload
//! ```
//!
//! The header lives in atomics rather than in the byte array, which keeps
//! every access an atomic load/store/add. Next to it sits a sequence gate
//! that is odd while a store is copying bytes; readers retry until they
//! see the same even value before and after their copy, so a load never
//! returns a torn payload.
//!
//! Waiters block on a condvar that every version change signals. The
//! lock only orders the version check against the wakeup; the data path
//! never takes it.

use std::sync::atomic::{fence, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::error::ChannelError;

/// Bytes before the payload.
pub const HEADER_SIZE: usize = 8;

/// The shared storage. Payload space is reserved up to the maximum size
/// when the region is created, so growth never moves stored bytes.
#[derive(Debug)]
pub struct Region {
    length: AtomicU32,
    version: AtomicU32,
    seq: AtomicU32,
    byte_len: AtomicUsize,
    payload: Box<[AtomicU8]>,
    wake_lock: Mutex<()>,
    wake: Condvar,
}

impl Region {
    fn new(initial: usize, max: usize) -> Self {
        let max = max.max(HEADER_SIZE);
        let payload = (0..max - HEADER_SIZE).map(|_| AtomicU8::new(0)).collect();
        Self {
            length: AtomicU32::new(0),
            version: AtomicU32::new(0),
            seq: AtomicU32::new(0),
            byte_len: AtomicUsize::new(initial.clamp(HEADER_SIZE, max)),
            payload,
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// Wake every thread blocked in [`SharedBuffer::wait_version`]. Call
    /// after the version slot has changed.
    fn notify_version(&self) {
        drop(self.wake_lock.lock());
        self.wake.notify_all();
    }

    /// Largest byte length this region can grow to.
    fn reserved(&self) -> usize {
        self.payload.len() + HEADER_SIZE
    }
}

/// Result of waiting on the version slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The version changed while waiting
    Ok,
    /// The version already differed when the wait began
    NotEqual,
    /// Nothing changed before the timeout
    TimedOut,
}

/// One side's handle on a shared region.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    region: Arc<Region>,
    max_size: usize,
}

impl SharedBuffer {
    pub fn new(initial: usize, max: usize) -> Self {
        let region = Arc::new(Region::new(initial, max));
        let max_size = region.reserved();
        Self { region, max_size }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.shared_buffer_initial, config.shared_buffer_max)
    }

    /// The region, for handing to the other thread.
    pub fn buffer(&self) -> Arc<Region> {
        Arc::clone(&self.region)
    }

    /// Rebind to a region handed over by the other side. The size limit
    /// never drops below what this handle allowed before.
    pub fn set_buffer(&mut self, region: Arc<Region>) {
        self.max_size = self.max_size.max(region.byte_len.load(Ordering::Acquire));
        self.region = region;
    }

    /// Current size in bytes, header included.
    pub fn byte_len(&self) -> usize {
        self.region.byte_len.load(Ordering::Acquire)
    }

    pub fn version(&self) -> u32 {
        self.region.version.load(Ordering::Acquire)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Writing
    // ═══════════════════════════════════════════════════════════════════

    /// Serialize `value` as JSON and store it. Returns the new version.
    pub fn store<T: Serialize + ?Sized>(&self, value: &T) -> Result<u32, ChannelError> {
        let bytes = serde_json::to_vec(value).map_err(ChannelError::Encode)?;
        self.store_data(&bytes)
    }

    /// Store raw bytes. Returns the new version.
    pub fn store_data(&self, bytes: &[u8]) -> Result<u32, ChannelError> {
        let region = &self.region;
        self.ensure_capacity(bytes.len() + HEADER_SIZE)?;

        region.seq.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        for (slot, byte) in region.payload.iter().zip(bytes) {
            slot.store(*byte, Ordering::Relaxed);
        }
        region.length.store(bytes.len() as u32, Ordering::Relaxed);
        region.seq.fetch_add(1, Ordering::Release);

        let version = region.version.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        region.notify_version();
        Ok(version)
    }

    fn ensure_capacity(&self, required: usize) -> Result<(), ChannelError> {
        let max = self.max_size.min(self.region.reserved());
        if required > max {
            error!(required, max, "shared buffer is full");
            return Err(ChannelError::Capacity { required, max });
        }
        let current = self.byte_len();
        if required > current {
            let grown = (required * 2).max(current * 2).min(max);
            self.region.byte_len.fetch_max(grown, Ordering::AcqRel);
            debug!(from = current, to = grown, "shared buffer grown");
        }
        Ok(())
    }

    /// Store `value` once the version moves away from `known`, or after
    /// `timeout` if it never does.
    pub fn wait_store<T: Serialize + ?Sized>(
        &self,
        value: &T,
        known: u32,
        timeout: Duration,
    ) -> Result<WaitOutcome, ChannelError> {
        let outcome = self.wait_version(known, timeout);
        if outcome == WaitOutcome::TimedOut {
            warn!(known, ?timeout, "wait for shared buffer release timed out; storing anyway");
        }
        self.store(value)?;
        Ok(outcome)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reading
    // ═══════════════════════════════════════════════════════════════════

    /// Copy out the stored payload, `None` if nothing was stored. With
    /// `reset`, the version returns to zero afterwards.
    pub fn load_data(&self, reset: bool) -> Option<Vec<u8>> {
        let region = &self.region;
        let data = loop {
            let before = region.seq.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let length = region.length.load(Ordering::Relaxed) as usize;
            let data: Vec<u8> = region
                .payload
                .iter()
                .take(length)
                .map(|b| b.load(Ordering::Relaxed))
                .collect();
            fence(Ordering::Acquire);
            if region.seq.load(Ordering::Relaxed) == before {
                break data;
            }
        };
        if reset {
            region.version.store(0, Ordering::Release);
            region.notify_version();
        }
        (!data.is_empty()).then_some(data)
    }

    /// Decode the stored JSON payload. `Ok(None)` when empty; a payload
    /// that does not decode is returned as an error and logged.
    pub fn load<T: DeserializeOwned>(&self, reset: bool) -> Result<Option<T>, ChannelError> {
        let Some(data) = self.load_data(reset) else {
            return Ok(None);
        };
        serde_json::from_slice(&data).map(Some).map_err(|err| {
            warn!(%err, "shared buffer payload did not decode");
            ChannelError::Decode(err)
        })
    }

    /// Block until the version differs from `known` or `timeout` elapses.
    pub fn wait_version(&self, known: u32, timeout: Duration) -> WaitOutcome {
        if self.version() != known {
            return WaitOutcome::NotEqual;
        }
        let deadline = Instant::now() + timeout;
        let region = &self.region;
        let mut guard = region.wake_lock.lock();
        loop {
            if self.version() != known {
                return WaitOutcome::Ok;
            }
            if region.wake.wait_until(&mut guard, deadline).timed_out() {
                return if self.version() != known {
                    WaitOutcome::Ok
                } else {
                    WaitOutcome::TimedOut
                };
            }
        }
    }
}

impl Default for SharedBuffer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
