//! Allocation seam for event cells
//!
//! Any `GlobalAlloc` that lives for `'static` can back events. A null
//! return from `alloc` is the allocation-failure path.
//!
//! Author: Moroya Sakamoto

use core::alloc::{GlobalAlloc, Layout};
use std::alloc::System;

/// Allocator an event cell is carved from and returned to
pub type EventAllocator = dyn GlobalAlloc + Sync;

/// Host system allocator (malloc / free on POSIX hosts)
pub struct SystemAllocator;

unsafe impl GlobalAlloc for SystemAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

/// Default allocator for `Event::new` and `EventHandle::create`
pub static SYSTEM: SystemAllocator = SystemAllocator;
