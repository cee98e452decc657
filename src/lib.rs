//! ALICE-Event — auto-reset event for hosted RTOS ports
//!
//! Bridges a kernel's "signal a task" onto host threads:
//! - One pending-signal slot per event (no queuing, auto-reset on wait)
//! - Mutex + condvar per event, no global state
//! - Owning `Event` with RAII teardown, plus an opaque `EventHandle`
//!   whose operations treat a null handle as a no-op
//! - Optional C ABI (`event_create` / `event_wait` / `event_signal` /
//!   `event_delete`) for the FreeRTOS POSIX port
//!
//! Without the `std` feature only the allocation-free latch and error
//! types are available.
//!
//! Author: Moroya Sakamoto

#![cfg_attr(not(feature = "std"), no_std)]

pub mod state;
pub mod error;

#[cfg(feature = "std")]
pub mod allocator;
#[cfg(feature = "std")]
pub mod deadline;
#[cfg(feature = "std")]
pub mod event;
#[cfg(feature = "std")]
pub mod handle;

#[cfg(feature = "ffi")]
pub mod ffi;
#[cfg(feature = "python")]
pub mod python;

pub use state::{EventState, EventStats, Latch};
pub use error::{EventError, Result};

#[cfg(feature = "std")]
pub use allocator::{EventAllocator, SystemAllocator};
#[cfg(feature = "std")]
pub use event::Event;
#[cfg(feature = "std")]
pub use handle::EventHandle;
