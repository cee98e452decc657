//! C ABI for the FreeRTOS POSIX port
//!
//! Exports the four `event_*` symbols the GCC/Posix port links against.
//! Handles are opaque `void *`; NULL is accepted everywhere and ignored.
//!
//! ```c
//! void *event_create(void);
//! void  event_wait(void *event);
//! void  event_signal(void *event);
//! void  event_delete(void *event);
//! ```
//!
//! Author: Moroya Sakamoto

use core::ffi::c_void;

use crate::handle::EventHandle;

/// Create an event, NULL on allocation failure
#[no_mangle]
pub extern "C" fn event_create() -> *mut c_void {
    EventHandle::create().as_raw()
}

/// Block until signaled, then consume the signal
///
/// # Safety
/// `event` must be NULL or a live pointer from `event_create`.
#[no_mangle]
pub unsafe extern "C" fn event_wait(event: *mut c_void) {
    unsafe { EventHandle::from_raw(event).wait() }
}

/// Latch a signal and wake one waiter
///
/// # Safety
/// `event` must be NULL or a live pointer from `event_create`.
#[no_mangle]
pub unsafe extern "C" fn event_signal(event: *mut c_void) {
    unsafe { EventHandle::from_raw(event).signal() }
}

/// Release an event
///
/// # Safety
/// `event` must be NULL or a live pointer from `event_create`, with no
/// thread blocked in `event_wait` on it.
#[no_mangle]
pub unsafe extern "C" fn event_delete(event: *mut c_void) {
    unsafe { EventHandle::from_raw(event).delete() }
}
