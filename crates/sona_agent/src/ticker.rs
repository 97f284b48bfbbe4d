//! Cancellable sleeps for the poll loop.
//!
//! The poll loop asks its [`Ticker`] to sleep and stops as soon as a sleep
//! reports [`Tick::Cancelled`]. [`IntervalTicker`] sleeps in real time.
//! [`ManualTicker`] records the requested durations and returns immediately,
//! so tests can drive the loop without waiting.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a [`Ticker::sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The full duration passed.
    Elapsed,
    /// The ticker was cancelled; the loop must stop.
    Cancelled,
}

/// A source of sleeps that can be cancelled from another thread.
pub trait Ticker: Send {
    /// Sleeps for `duration` unless cancelled first.
    fn sleep(&mut self, duration: Duration) -> Tick;

    /// Returns a handle that cancels this ticker.
    fn cancel_handle(&self) -> CancelHandle;
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Cancels a ticker and wakes it if it is sleeping.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Creates a fresh, uncancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the ticker. Idempotent.
    pub fn cancel(&self) {
        *self.state.cancelled.lock() = true;
        self.state.wakeup.notify_all();
    }

    /// Returns true once [`CancelHandle::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.state.cancelled.lock()
    }
}

/// A ticker that sleeps in real time.
#[derive(Debug, Clone, Default)]
pub struct IntervalTicker {
    cancel: CancelHandle,
}

impl IntervalTicker {
    /// Creates a new ticker.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ticker for IntervalTicker {
    fn sleep(&mut self, duration: Duration) -> Tick {
        let state = &self.cancel.state;
        let mut cancelled = state.cancelled.lock();

        // A duration past the end of the clock only ends by cancellation.
        let Some(deadline) = Instant::now().checked_add(duration) else {
            while !*cancelled {
                state.wakeup.wait(&mut cancelled);
            }
            return Tick::Cancelled;
        };

        loop {
            if *cancelled {
                return Tick::Cancelled;
            }
            if state.wakeup.wait_until(&mut cancelled, deadline).timed_out() {
                return if *cancelled {
                    Tick::Cancelled
                } else {
                    Tick::Elapsed
                };
            }
        }
    }

    fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

/// A ticker for tests: never blocks, records every sleep, and cancels itself
/// after a fixed number of sleeps.
///
/// Clones share their state, so a test can keep one clone for inspection
/// while the driver consumes another.
#[derive(Debug, Clone)]
pub struct ManualTicker {
    cancel: CancelHandle,
    sleeps: Arc<Mutex<Vec<Duration>>>,
    limit: Option<usize>,
}

impl ManualTicker {
    /// Creates a ticker that only stops when cancelled through its handle.
    pub fn new() -> Self {
        Self {
            cancel: CancelHandle::new(),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            limit: None,
        }
    }

    /// Creates a ticker that grants `sleeps` sleeps, then reports cancellation.
    pub fn cancel_after(sleeps: usize) -> Self {
        Self {
            limit: Some(sleeps),
            ..Self::new()
        }
    }

    /// Returns every granted sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Returns the total simulated time slept.
    pub fn elapsed(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Default for ManualTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ticker for ManualTicker {
    fn sleep(&mut self, duration: Duration) -> Tick {
        if self.cancel.is_cancelled() {
            return Tick::Cancelled;
        }

        let mut sleeps = self.sleeps.lock();
        if self.limit.is_some_and(|limit| sleeps.len() >= limit) {
            drop(sleeps);
            self.cancel.cancel();
            return Tick::Cancelled;
        }
        sleeps.push(duration);
        Tick::Elapsed
    }

    fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}
