//! Event state — the auto-reset flag, no locking, no heap
//!
//! `Latch` is the single pending-signal slot an event guards with its
//! lock. Posting sets it, consuming clears it. There is exactly one slot:
//! posts never queue.
//!
//! Author: Moroya Sakamoto

/// Observable state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// A signal is pending and the next wait will consume it
    Set,
    /// No signal is pending, waits block
    Unset,
}

/// Counter snapshot for one event
///
/// Size: 32 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStats {
    /// Signal calls received
    pub posts: u64,
    /// Signal calls that found a signal already pending
    pub coalesced: u64,
    /// Waits that consumed a signal
    pub consumed: u64,
    /// Bounded waits that expired
    pub timeouts: u64,
}

impl EventStats {
    /// Signals posted but not consumed (0 or 1)
    pub fn pending(&self) -> u64 {
        self.posts - self.coalesced - self.consumed
    }
}

/// Single-slot auto-reset latch
///
/// Must only be touched while the owning event's lock is held.
#[derive(Debug, Clone, Copy)]
pub struct Latch {
    /// Pending signal flag
    signaled: bool,
    /// Running counters
    stats: EventStats,
}

impl Latch {
    /// Fresh latch, nothing pending
    pub const fn new() -> Self {
        Self {
            signaled: false,
            stats: EventStats {
                posts: 0,
                coalesced: 0,
                consumed: 0,
                timeouts: 0,
            },
        }
    }

    /// Latch a signal
    ///
    /// Returns false when a signal was already pending; the post is then
    /// absorbed into it.
    pub fn post(&mut self) -> bool {
        self.stats.posts += 1;
        if self.signaled {
            self.stats.coalesced += 1;
            return false;
        }
        self.signaled = true;
        true
    }

    /// Consume the pending signal, if any
    pub fn take(&mut self) -> bool {
        if !self.signaled {
            return false;
        }
        self.signaled = false;
        self.stats.consumed += 1;
        true
    }

    /// Record an expired bounded wait
    pub fn record_timeout(&mut self) {
        self.stats.timeouts += 1;
    }

    /// Is a signal pending?
    pub fn is_signaled(&self) -> bool {
        self.signaled
    }

    /// Current state
    pub fn state(&self) -> EventState {
        if self.signaled {
            EventState::Set
        } else {
            EventState::Unset
        }
    }

    /// Counter snapshot
    pub fn stats(&self) -> EventStats {
        self.stats
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}
