//! Lock-free state exchange between the host and the execution thread

pub mod buffer;

pub use buffer::{Region, SharedBuffer, WaitOutcome, HEADER_SIZE};
