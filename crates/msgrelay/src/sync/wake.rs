// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Forwarder wake-up signal.
//!
//! Producers call [`WakeNotifier::notify`] after queueing work; the forwarder
//! calls [`WakeNotifier::wait_timeout`] when it finds the queue empty. A
//! notification raised while nobody waits is latched and consumed by the next
//! wait, so a push between "queue empty" and "park" is never lost.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Latched single-consumer wake signal.
#[derive(Debug, Default)]
pub struct WakeNotifier {
    latched: Mutex<bool>,
    condvar: Condvar,
}

impl WakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a notification and wake the consumer if it is parked.
    pub fn notify(&self) {
        *self.latched.lock() = true;
        self.condvar.notify_one();
    }

    /// Park until a notification is latched or `timeout` elapses.
    ///
    /// Returns `true` if a notification was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut latched = self.latched.lock();
        while !*latched {
            if self.condvar.wait_until(&mut latched, deadline).timed_out() {
                break;
            }
        }
        std::mem::replace(&mut *latched, false)
    }
}
