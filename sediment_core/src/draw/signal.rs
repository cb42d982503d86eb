// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wake-up signals between the refresh thread, draw units and drivers.
//!
//! A [`Signal`] holds at most one pending request: any number of
//! [`notify`](Signal::notify) calls before a [`wait`](Signal::wait) are
//! coalesced into one wake-up. Waiters always re-check the condition they
//! wait for, so a spurious wake-up costs one loop iteration and nothing else.

use core::sync::atomic::{AtomicBool, Ordering};

/// A coalescing one-slot wake-up primitive.
pub trait Signal: Send + Sync {
    /// Sets the pending request and wakes a waiter, if any.
    fn notify(&self);

    /// Blocks until a request is pending, then consumes it.
    fn wait(&self);
}

/// Busy-waiting signal for `no_std` targets.
#[derive(Debug, Default)]
pub struct SpinSignal {
    pending: AtomicBool,
}

impl SpinSignal {
    /// Creates a signal with no pending request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }
}

impl Signal for SpinSignal {
    fn notify(&self) {
        self.pending.store(true, Ordering::Release);
    }

    fn wait(&self) {
        while !self.pending.swap(false, Ordering::AcqRel) {
            core::hint::spin_loop();
        }
    }
}

/// Blocking signal backed by a mutex and condition variable.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct CondvarSignal {
    pending: std::sync::Mutex<bool>,
    cond: std::sync::Condvar,
}

#[cfg(feature = "std")]
impl CondvarSignal {
    /// Creates a signal with no pending request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "std")]
impl Signal for CondvarSignal {
    fn notify(&self) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *pending = true;
        self.cond.notify_one();
    }

    fn wait(&self) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while !*pending {
            pending = self
                .cond
                .wait(pending)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        *pending = false;
    }
}

/// The signal used when the caller does not provide one.
#[must_use]
pub fn default_signal() -> alloc::sync::Arc<dyn Signal> {
    #[cfg(feature = "std")]
    {
        alloc::sync::Arc::new(CondvarSignal::new())
    }
    #[cfg(not(feature = "std"))]
    {
        alloc::sync::Arc::new(SpinSignal::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_coalesce() {
        let s = SpinSignal::new();
        s.notify();
        s.notify();
        s.wait();
        assert!(
            !s.pending.load(Ordering::Acquire),
            "one wait consumes all earlier notifications"
        );
    }
}
