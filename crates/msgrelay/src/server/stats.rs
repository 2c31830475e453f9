// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every worker.
///
/// All fields use relaxed atomics; readers only need monotonic snapshots.
#[derive(Debug, Default)]
pub(crate) struct ServerMetrics {
    pub accepted: AtomicU64,
    pub duplicates: AtomicU64,
    pub malformed: AtomicU64,
    pub relayed: AtomicU64,
    pub rotations: AtomicU64,
    pub discarded: AtomicU64,
}

impl ServerMetrics {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            relayed: self.relayed.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time server statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Messages that passed the duplicate filter.
    pub accepted: u64,
    /// Messages rejected by the duplicate filter.
    pub duplicates: u64,
    /// Datagrams too short to hold a message.
    pub malformed: u64,
    /// Messages written to the relay connection.
    pub relayed: u64,
    /// Page rotations across all shards.
    pub rotations: u64,
    /// Entries dropped by rotations.
    pub discarded: u64,
}
