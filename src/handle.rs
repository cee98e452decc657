//! Opaque event handle — the shape a kernel port links against
//!
//! A pointer-sized, copyable reference to an event cell. Every operation
//! starts with a null guard: a null handle (for example one returned by a
//! failed `create`) turns wait, signal and delete into silent no-ops.
//!
//! # Caller contract
//!
//! The handle does not track liveness. After `delete`, every copy of the
//! handle dangles. Using it, deleting it while another thread is blocked
//! in `wait`, or racing `delete` against any other call is undefined
//! behavior. The hosting scheduler owns these lifetime decisions.
//!
//! Author: Moroya Sakamoto

use core::ffi::c_void;
use core::ptr::{self, NonNull};

use crate::allocator::{EventAllocator, SYSTEM};
use crate::event::{Event, EventCell};

/// Opaque, pointer-sized event handle
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(*mut c_void);

// A handle is an address; the obligations sit on the unsafe operations.
unsafe impl Send for EventHandle {}
unsafe impl Sync for EventHandle {}

impl EventHandle {
    /// The invalid handle
    pub const NULL: EventHandle = EventHandle(ptr::null_mut());

    /// Create an unsignaled event on the system allocator
    ///
    /// Returns `EventHandle::NULL` if memory is exhausted.
    pub fn create() -> Self {
        Self::create_in(&SYSTEM)
    }

    /// Create an unsignaled event on `allocator`
    pub fn create_in(allocator: &'static EventAllocator) -> Self {
        EventCell::allocate(allocator).map_or(Self::NULL, Self::from_cell)
    }

    pub(crate) fn from_cell(cell: NonNull<EventCell>) -> Self {
        Self(cell.as_ptr().cast::<c_void>())
    }

    /// Wrap a raw pointer previously obtained from `as_raw`
    pub const fn from_raw(raw: *mut c_void) -> Self {
        Self(raw)
    }

    /// Raw pointer for crossing an FFI boundary
    pub const fn as_raw(self) -> *mut c_void {
        self.0
    }

    /// Is this the invalid handle?
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    fn cell_ptr(self) -> Option<NonNull<EventCell>> {
        NonNull::new(self.0.cast::<EventCell>())
    }

    /// # Safety
    /// Handle must be null or live for `'a`.
    unsafe fn cell<'a>(self) -> Option<&'a EventCell> {
        self.cell_ptr().map(|cell| unsafe { cell.as_ref() })
    }

    /// Block until signaled, then consume the signal
    ///
    /// # Safety
    /// The handle must be null or live, and must not be deleted while
    /// this call blocks.
    pub unsafe fn wait(self) {
        if let Some(cell) = unsafe { self.cell() } {
            cell.wait();
        }
    }

    /// Consume a pending signal without blocking
    ///
    /// Returns false for a null handle.
    ///
    /// # Safety
    /// The handle must be null or live.
    pub unsafe fn try_wait(self) -> bool {
        match unsafe { self.cell() } {
            Some(cell) => cell.try_wait(),
            None => false,
        }
    }

    /// Latch a signal and wake one waiter
    ///
    /// # Safety
    /// The handle must be null or live.
    pub unsafe fn signal(self) {
        if let Some(cell) = unsafe { self.cell() } {
            cell.signal();
        }
    }

    /// Release the event behind this handle
    ///
    /// # Safety
    /// The handle must be null or live, no thread may be blocked in
    /// `wait` on it, and no other call on it may be in flight. Every copy
    /// of the handle dangles afterwards.
    pub unsafe fn delete(self) {
        if let Some(cell) = self.cell_ptr() {
            unsafe { EventCell::release(cell) };
        }
    }

    /// Take back ownership as an `Event`
    ///
    /// Returns `None` for a null handle.
    ///
    /// # Safety
    /// The handle must be null or live, and no other copy of it may be
    /// used afterwards.
    pub unsafe fn into_event(self) -> Option<Event> {
        self.cell_ptr().map(Event::from_cell)
    }
}

impl Default for EventHandle {
    fn default() -> Self {
        Self::NULL
    }
}
