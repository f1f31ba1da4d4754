//! Concurrent per-surface pixel capture.
//!
//! This module provides:
//! - The capture coordinator with its message-passing join (`capture_all`)

pub mod coordinator;

pub use coordinator::capture_all;
