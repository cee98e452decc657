//! Deadline — monotonic bound for timed waits
//!
//! Fixed once at entry to a bounded wait. Each condvar wait sleeps for
//! `remaining()` only, so spurious wakeups never stretch the bound.
//!
//! Author: Moroya Sakamoto

use std::time::{Duration, Instant};

/// Deadline tracker for a single bounded wait
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    /// Activation time
    start: Instant,
    /// Deadline (absolute), `None` if `start + timeout` overflows
    deadline: Option<Instant>,
}

impl Deadline {
    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self::starting_at(Instant::now(), timeout)
    }

    /// Deadline `timeout` after `start`
    pub fn starting_at(start: Instant, timeout: Duration) -> Self {
        Self {
            start,
            deadline: start.checked_add(timeout),
        }
    }

    /// Has the deadline passed at `current`?
    pub fn is_expired_at(&self, current: Instant) -> bool {
        match self.deadline {
            Some(deadline) => current >= deadline,
            None => false,
        }
    }

    /// Has the deadline passed?
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Time left at `current` (zero once expired)
    ///
    /// An unrepresentable deadline reports `Duration::MAX`.
    pub fn remaining_at(&self, current: Instant) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(current),
            None => Duration::MAX,
        }
    }

    /// Time left until the deadline
    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    /// Elapsed since start
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
