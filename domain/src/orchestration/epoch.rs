//! Epoch guard
//!
//! A monotonically increasing counter stamped on every asynchronous
//! operation. A result whose stamp differs from the current epoch belongs to
//! work that was interrupted and must be dropped without side effects.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A captured epoch value (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct EpochGuard {
    current: AtomicU64,
}

impl EpochGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to a new epoch and return it
    pub fn bump(&self) -> Epoch {
        Epoch(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn current(&self) -> Epoch {
        Epoch(self.current.load(Ordering::SeqCst))
    }

    pub fn is_stale(&self, captured: Epoch) -> bool {
        captured != self.current()
    }
}
