// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recency window duplicate filter.
//!
//! Tracks a `floor` watermark plus a ring of the last `capacity` accepted ids.
//! An id is rejected if it is below the floor or still present in the ring.
//!
//! The floor advances by exactly one, and only when the id equal to the
//! current floor is accepted. It never fast-forwards across a run of
//! already-accepted higher ids, so a floor value that never arrives pins the
//! watermark in place and deduplication above it relies on the ring alone.
//!
//! Not thread-safe; the server serializes every worker through one lock.

use crate::error::{Error, Result};
use crate::message::MsgId;

/// Fixed-capacity recency filter over message ids.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    floor: MsgId,
    ring: Box<[Option<MsgId>]>,
    cursor: usize,
}

impl SlidingWindow {
    /// Create a window remembering the last `capacity` accepted ids.
    ///
    /// Any non-zero capacity is accepted; no power of two is required.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(
                "sliding window capacity must be non-zero".into(),
            ));
        }
        Ok(Self {
            floor: 0,
            ring: vec![None; capacity].into_boxed_slice(),
            cursor: 0,
        })
    }

    /// Try to accept `id`; returns `false` for a duplicate or superseded id.
    pub fn insert(&mut self, id: MsgId) -> bool {
        if id < self.floor {
            return false;
        }
        if self.contains(id) {
            return false;
        }
        if id == self.floor {
            self.floor = self.floor.saturating_add(1);
        }

        self.ring[self.cursor] = Some(id);
        self.cursor = (self.cursor + 1) % self.ring.len();
        true
    }

    /// Whether `id` is one of the live ring entries (ignores the floor).
    pub fn contains(&self, id: MsgId) -> bool {
        self.ring.iter().any(|slot| *slot == Some(id))
    }

    /// Lowest id that can still be accepted.
    #[inline]
    pub fn floor(&self) -> MsgId {
        self.floor
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    /// Number of live ids in the ring (saturates at capacity).
    pub fn len(&self) -> usize {
        self.ring.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.iter().all(Option::is_none)
    }

    /// Live ids, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = MsgId> + '_ {
        let (newer, older) = self.ring.split_at(self.cursor);
        older.iter().chain(newer.iter()).filter_map(|slot| *slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(SlidingWindow::new(0).is_err());
    }

    #[test]
    fn test_below_floor_always_rejected() {
        let mut w = SlidingWindow::new(4).unwrap();
        for id in 0..10 {
            assert!(w.insert(id));
        }
        assert_eq!(w.floor(), 10);
        // 0..6 have left the ring already; the floor alone rejects them.
        for id in 0..10 {
            assert!(!w.insert(id), "id {} below floor accepted", id);
        }
    }

    #[test]
    fn test_ring_rejects_repeat_above_floor() {
        let mut w = SlidingWindow::new(4).unwrap();
        assert!(w.insert(50));
        assert_eq!(w.floor(), 0);
        assert!(!w.insert(50));
        assert!(w.contains(50));
    }

    #[test]
    fn test_documented_wraparound_scenario() {
        let mut w = SlidingWindow::new(3).unwrap();

        assert!(w.insert(0));
        assert_eq!(w.floor(), 1);
        assert!(w.insert(1));
        assert_eq!(w.floor(), 2);
        assert!(w.insert(2));
        assert_eq!(w.floor(), 3);

        assert!(!w.insert(0));

        assert!(w.insert(3));
        assert_eq!(w.floor(), 4);
        // Slot that held 0 now holds 3.
        assert!(!w.contains(0));
        assert_eq!(w.recent().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_floor_does_not_fast_forward() {
        let mut w = SlidingWindow::new(8).unwrap();
        assert!(w.insert(1));
        assert!(w.insert(2));
        assert!(w.insert(3));
        assert_eq!(w.floor(), 0);

        assert!(w.insert(0));
        // Only the exact watermark moves it, one step at a time.
        assert_eq!(w.floor(), 1);
    }

    #[test]
    fn test_evicted_id_above_floor_is_reaccepted() {
        let mut w = SlidingWindow::new(2).unwrap();
        assert!(w.insert(10));
        assert!(w.insert(11));
        assert!(w.insert(12)); // evicts 10
        assert!(!w.contains(10));
        assert!(w.insert(10));
    }

    #[test]
    fn test_non_power_of_two_capacity() {
        let mut w = SlidingWindow::new(5).unwrap();
        assert_eq!(w.capacity(), 5);
        assert!(w.is_empty());
        for id in 100..107 {
            assert!(w.insert(id));
        }
        assert_eq!(w.len(), 5);
        assert_eq!(w.recent().collect::<Vec<_>>(), vec![102, 103, 104, 105, 106]);
    }

    #[test]
    fn test_max_id_is_not_a_sentinel() {
        let mut w = SlidingWindow::new(4).unwrap();
        assert!(w.insert(u64::MAX));
        assert!(!w.insert(u64::MAX));
    }
}
