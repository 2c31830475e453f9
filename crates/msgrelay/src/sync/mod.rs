// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronization primitives shared by the containers and workers.

/// Busy-wait mutual exclusion owning its data.
pub mod spinlock;
/// Latched condvar wake-up for the forwarder.
pub mod wake;

pub use spinlock::{SpinLock, SpinLockGuard};
pub use wake::WakeNotifier;
