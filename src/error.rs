//! Event errors
//!
//! Null-handle use is not an error: those calls are silent no-ops.
//!
//! Author: Moroya Sakamoto

use thiserror::Error;

/// Failures an event operation can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventError {
    /// The allocator returned no memory for the event cell
    #[error("event allocation failed")]
    AllocationFailure,
    /// A bounded wait expired before a signal arrived
    #[error("timed out waiting for event")]
    Timeout,
}

/// Crate result type
pub type Result<T, E = EventError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;
    use std::string::ToString;

    #[test]
    fn test_error_display() {
        assert_eq!(EventError::AllocationFailure.to_string(), "event allocation failed");
        assert_eq!(EventError::Timeout.to_string(), "timed out waiting for event");
    }
}
