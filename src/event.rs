//! Event — auto-reset binary signal for hosted RTOS ports
//!
//! One heap cell per event: a `Latch` behind a `Mutex`, plus a `Condvar`
//! to park waiters. `signal` never blocks; `wait` blocks until a signal
//! is pending and consumes it before returning.
//!
//! The cell remembers which allocator produced it so teardown returns the
//! memory to the same place, whether it goes through `Drop`,
//! `Event::delete`, or `EventHandle::delete`.
//!
//! Author: Moroya Sakamoto

use core::alloc::Layout;
use core::fmt;
use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{trace, warn};

use crate::allocator::{EventAllocator, SYSTEM};
use crate::deadline::Deadline;
use crate::error::{EventError, Result};
use crate::handle::EventHandle;
use crate::state::{EventState, EventStats, Latch};

/// Backing storage shared by `Event` and `EventHandle`
pub(crate) struct EventCell {
    /// Pending flag and counters, only touched under this lock
    latch: Mutex<Latch>,
    /// Parks waiters until the latch is set
    condvar: Condvar,
    /// Where this cell must be returned
    allocator: &'static EventAllocator,
}

impl EventCell {
    const LAYOUT: Layout = Layout::new::<EventCell>();

    fn new(allocator: &'static EventAllocator) -> Self {
        Self {
            latch: Mutex::new(Latch::new()),
            condvar: Condvar::new(),
            allocator,
        }
    }

    /// Carve a cell out of `allocator` and initialize it
    ///
    /// Returns `None` if the allocator has no memory; nothing is
    /// initialized in that case.
    pub(crate) fn allocate(allocator: &'static EventAllocator) -> Option<NonNull<EventCell>> {
        let raw = unsafe { allocator.alloc(Self::LAYOUT) }.cast::<EventCell>();
        let Some(cell) = NonNull::new(raw) else {
            warn!("event allocation failed ({} bytes)", Self::LAYOUT.size());
            return None;
        };
        unsafe { cell.as_ptr().write(EventCell::new(allocator)) };
        trace!("event created at {:p}", cell);
        Some(cell)
    }

    /// Tear down the lock/condvar pair and free the cell
    ///
    /// # Safety
    /// `cell` must come from `allocate`, must not have been released, and
    /// no thread may be inside any operation on it.
    pub(crate) unsafe fn release(cell: NonNull<EventCell>) {
        let allocator = unsafe { cell.as_ref().allocator };
        unsafe {
            ptr::drop_in_place(cell.as_ptr());
            allocator.dealloc(cell.as_ptr().cast::<u8>(), Self::LAYOUT);
        }
        trace!("event released at {:p}", cell);
    }

    /// Lock the latch, recovering from poisoning
    ///
    /// The latch has no multi-step invariant for a panic to break.
    fn lock(&self) -> MutexGuard<'_, Latch> {
        self.latch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wait(&self) {
        let mut latch = self.lock();
        while !latch.take() {
            latch = self
                .condvar
                .wait(latch)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn try_wait(&self) -> bool {
        self.lock().take()
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = Deadline::after(timeout);
        let mut latch = self.lock();
        loop {
            if latch.take() {
                return Ok(());
            }
            let remaining = deadline.remaining();
            if remaining.is_zero() {
                latch.record_timeout();
                trace!("event wait timed out after {:?}", deadline.elapsed());
                return Err(EventError::Timeout);
            }
            latch = match self.condvar.wait_timeout(latch, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub(crate) fn signal(&self) {
        let mut latch = self.lock();
        latch.post();
        self.condvar.notify_one();
    }

    fn state(&self) -> EventState {
        self.lock().state()
    }

    fn stats(&self) -> EventStats {
        self.lock().stats()
    }
}

/// Owning event handle
///
/// Dropping the event releases its lock, condvar and memory. Share it
/// between threads by reference (`std::thread::scope`) or behind an `Arc`.
/// No thread may still be blocked in `wait` when the last owner drops it.
pub struct Event {
    cell: NonNull<EventCell>,
}

// The cell is only reached through `&EventCell`, whose state lives behind
// a Mutex/Condvar pair.
unsafe impl Send for Event {}
unsafe impl Sync for Event {}

impl Event {
    /// Create an unsignaled event on the system allocator
    pub fn new() -> Result<Self> {
        Self::new_in(&SYSTEM)
    }

    /// Create an unsignaled event on `allocator`
    pub fn new_in(allocator: &'static EventAllocator) -> Result<Self> {
        EventCell::allocate(allocator)
            .map(|cell| Self { cell })
            .ok_or(EventError::AllocationFailure)
    }

    pub(crate) fn from_cell(cell: NonNull<EventCell>) -> Self {
        Self { cell }
    }

    fn cell(&self) -> &EventCell {
        unsafe { self.cell.as_ref() }
    }

    /// Block until signaled, then consume the signal
    pub fn wait(&self) {
        self.cell().wait();
    }

    /// Consume a pending signal without blocking
    ///
    /// Returns false if nothing was pending.
    pub fn try_wait(&self) -> bool {
        self.cell().try_wait()
    }

    /// Block for at most `timeout`
    ///
    /// On `Err(EventError::Timeout)` nothing was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        self.cell().wait_timeout(timeout)
    }

    /// Latch a signal and wake one waiter
    pub fn signal(&self) {
        self.cell().signal();
    }

    /// Is a signal pending? Does not consume it.
    pub fn is_signaled(&self) -> bool {
        self.state() == EventState::Set
    }

    /// Current state, read under the lock
    pub fn state(&self) -> EventState {
        self.cell().state()
    }

    /// Counter snapshot
    pub fn stats(&self) -> EventStats {
        self.cell().stats()
    }

    /// Explicit teardown point
    pub fn delete(self) {
        drop(self);
    }

    /// Give up ownership to an opaque handle
    ///
    /// The handle must eventually be passed to `EventHandle::delete` (or
    /// turned back into an `Event`) or the cell leaks.
    pub fn into_handle(self) -> EventHandle {
        let this = ManuallyDrop::new(self);
        EventHandle::from_cell(this.cell)
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        unsafe { EventCell::release(self.cell) };
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("cell", &self.cell)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::testing::{CountingAllocator, FailingAllocator};
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    /// Long enough for a blocked thread to show it is blocked
    const BLOCKED: Duration = Duration::from_millis(50);
    /// Generous upper bound for a woken thread to report back
    const WAKE: Duration = Duration::from_secs(5);

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Spawn a thread that waits once and reports on the channel
    fn spawn_waiter(
        event: &Arc<Event>,
        tx: &mpsc::Sender<usize>,
        id: usize,
    ) -> thread::JoinHandle<()> {
        let event = Arc::clone(event);
        let tx = tx.clone();
        thread::spawn(move || {
            event.wait();
            tx.send(id).unwrap();
        })
    }

    #[test]
    fn test_new_event_unsignaled() {
        let event = Event::new().unwrap();
        assert!(!event.is_signaled());
        assert_eq!(event.state(), EventState::Unset);
        assert_eq!(event.stats(), EventStats::default());
    }

    #[test]
    fn test_signal_then_wait_same_thread() {
        let event = Event::new().unwrap();
        event.signal();
        assert!(event.is_signaled());
        event.wait(); // Returns immediately
        assert!(!event.is_signaled());
    }

    #[test]
    fn test_second_wait_blocks() {
        init_logger();
        let event = Arc::new(Event::new().unwrap());
        let (tx, rx) = mpsc::channel();

        event.signal();
        event.wait();

        let waiter = spawn_waiter(&event, &tx, 0);
        assert!(rx.recv_timeout(BLOCKED).is_err());

        event.signal();
        assert_eq!(rx.recv_timeout(WAKE), Ok(0));
        waiter.join().unwrap();
    }

    #[test]
    fn test_wait_blocks_until_signal() {
        let event = Arc::new(Event::new().unwrap());
        let (tx, rx) = mpsc::channel();
        let waiter = spawn_waiter(&event, &tx, 7);

        assert!(rx.recv_timeout(BLOCKED).is_err());
        assert!(!waiter.is_finished());

        let start = Instant::now();
        event.signal();
        assert_eq!(rx.recv_timeout(WAKE), Ok(7));
        assert!(start.elapsed() < WAKE);
        waiter.join().unwrap();
    }

    #[test]
    fn test_one_signal_releases_one_waiter() {
        let event = Arc::new(Event::new().unwrap());
        let (tx, rx) = mpsc::channel();

        event.signal();
        let first = spawn_waiter(&event, &tx, 1);
        let second = spawn_waiter(&event, &tx, 2);

        let released = rx.recv_timeout(WAKE).unwrap();
        assert!(released == 1 || released == 2);
        assert!(rx.recv_timeout(BLOCKED).is_err());

        event.signal();
        let other = rx.recv_timeout(WAKE).unwrap();
        assert_ne!(released, other);

        first.join().unwrap();
        second.join().unwrap();
        assert_eq!(event.stats().consumed, 2);
    }

    #[test]
    fn test_double_signal_satisfies_one_wait() {
        let event = Arc::new(Event::new().unwrap());
        event.signal();
        event.signal();

        event.wait();
        assert!(!event.try_wait());

        let (tx, rx) = mpsc::channel();
        let waiter = spawn_waiter(&event, &tx, 0);
        assert!(rx.recv_timeout(BLOCKED).is_err());
        event.signal();
        assert_eq!(rx.recv_timeout(WAKE), Ok(0));
        waiter.join().unwrap();

        let stats = event.stats();
        assert_eq!(stats.posts, 3);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.consumed, 2);
    }

    #[test]
    fn test_no_lost_wakeup() {
        init_logger();
        const N: usize = 8;
        let event = Arc::new(Event::new().unwrap());
        let gate = Arc::new(Mutex::new(()));
        let (tx, rx) = mpsc::channel();

        let consumers: Vec<_> = (0..N).map(|id| spawn_waiter(&event, &tx, id)).collect();

        // Producers hand over one signal at a time so none coalesce
        let producers: Vec<_> = (0..N)
            .map(|_| {
                let event = Arc::clone(&event);
                let gate = Arc::clone(&gate);
                thread::spawn(move || loop {
                    let turn = gate.lock().unwrap();
                    if !event.is_signaled() {
                        event.signal();
                        break;
                    }
                    drop(turn);
                    thread::yield_now();
                })
            })
            .collect();

        let mut seen: Vec<usize> = (0..N).map(|_| rx.recv_timeout(WAKE).unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..N).collect::<Vec<_>>());

        for handle in producers.into_iter().chain(consumers) {
            handle.join().unwrap();
        }
        let stats = event.stats();
        assert_eq!(stats.posts, N as u64);
        assert_eq!(stats.consumed, N as u64);
        assert_eq!(stats.coalesced, 0);
    }

    #[test]
    fn test_try_wait() {
        let event = Event::new().unwrap();
        assert!(!event.try_wait());
        event.signal();
        assert!(event.try_wait());
        assert!(!event.try_wait());
    }

    #[test]
    fn test_wait_timeout_expires_without_consuming() {
        let event = Event::new().unwrap();
        let start = Instant::now();
        assert_eq!(event.wait_timeout(Duration::from_millis(20)), Err(EventError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(event.stats().timeouts, 1);
        assert_eq!(event.stats().consumed, 0);
    }

    #[test]
    fn test_wait_timeout_pending_signal() {
        let event = Event::new().unwrap();
        event.signal();
        assert_eq!(event.wait_timeout(Duration::ZERO), Ok(()));
        assert!(!event.is_signaled());
        assert_eq!(event.wait_timeout(Duration::ZERO), Err(EventError::Timeout));
    }

    #[test]
    fn test_wait_timeout_signaled_in_time() {
        let event = Event::new().unwrap();
        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(10));
                event.signal();
            });
            assert_eq!(event.wait_timeout(WAKE), Ok(()));
        });
        assert_eq!(event.stats().timeouts, 0);
    }

    #[test]
    fn test_scoped_handshake() {
        let ping = Event::new().unwrap();
        let pong = Event::new().unwrap();
        thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..100 {
                    ping.wait();
                    pong.signal();
                }
            });
            for _ in 0..100 {
                ping.signal();
                pong.wait();
            }
        });
        assert_eq!(ping.stats().consumed, 100);
        assert_eq!(pong.stats().consumed, 100);
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let event = Arc::new(Event::new().unwrap());
        let poisoner = Arc::clone(&event);
        let result = thread::spawn(move || {
            let _latch = poisoner.cell().latch.lock().unwrap();
            panic!("poison the latch");
        })
        .join();
        assert!(result.is_err());
        assert!(event.cell().latch.is_poisoned());

        event.signal();
        assert!(event.is_signaled());
        event.wait();
        assert!(!event.try_wait());
    }

    #[test]
    fn test_allocation_failure() {
        static FAILING: FailingAllocator = FailingAllocator::new();
        assert_eq!(Event::new_in(&FAILING).unwrap_err(), EventError::AllocationFailure);
        assert_eq!(FAILING.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delete_returns_memory() {
        static COUNTING: CountingAllocator = CountingAllocator::new();
        let event = Event::new_in(&COUNTING).unwrap();
        assert_eq!(COUNTING.live(), 1);
        event.signal();
        event.delete();
        assert_eq!(COUNTING.live(), 0);

        {
            let _scoped = Event::new_in(&COUNTING).unwrap();
            assert_eq!(COUNTING.live(), 1);
        }
        assert_eq!(COUNTING.live(), 0);
        assert_eq!(COUNTING.total(), 2);
    }

    #[test]
    fn test_into_handle_keeps_cell_alive() {
        static COUNTING: CountingAllocator = CountingAllocator::new();
        let event = Event::new_in(&COUNTING).unwrap();
        event.signal();
        let handle = event.into_handle();
        assert_eq!(COUNTING.live(), 1);

        let event = unsafe { handle.into_event() }.unwrap();
        assert!(event.try_wait());
        drop(event);
        assert_eq!(COUNTING.live(), 0);
    }

    #[test]
    fn test_debug_shows_state() {
        let event = Event::new().unwrap();
        event.signal();
        let text = format!("{event:?}");
        assert!(text.contains("Set"));
    }
}
