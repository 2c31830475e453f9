// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lock-striped, double-buffered message table.
//!
//! Work is split across `P` shards, one per ingestion worker. Each shard owns
//! two physical [`HashTable`] pages (physical indices `shard` and `shard + P`)
//! and its own [`SpinLock`]; exactly one page per shard is active.
//!
//! # Rotation
//!
//! When an insert pushes the active page past [`ROTATION_LOAD_FACTOR`], the
//! shard flips to its twin page and the page that just filled is cleared in
//! place. Its contents, including the insert that triggered the rotation,
//! are discarded: there is no hand-off to a persistence consumer.
//!
//! # Locking
//!
//! `insert` touches a single shard lock. `has`/`get` walk the shards taking
//! one lock at a time, so a full scan is not atomic across shards.

use crate::containers::hash_table::{HashTable, Keyed};
use crate::error::{Error, Result};
use crate::sync::SpinLock;

/// Load factor above which a shard rotates to its twin page.
pub const ROTATION_LOAD_FACTOR: f32 = 0.8;

/// Outcome of [`PagedTable::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageInsert {
    /// Stored in the active page.
    Stored,
    /// The insert crossed the threshold; the retired page was cleared.
    Rotated {
        /// Physical page that was cleared.
        retired_page: usize,
        /// Physical page now receiving writes.
        active_page: usize,
        /// Live entries dropped with the retired page.
        discarded: usize,
    },
}

struct Shard<T> {
    pages: [HashTable<T>; 2],
    /// 0 selects physical page `shard`, 1 selects `shard + P`.
    active: usize,
}

/// Thread-safe sharded table of [`HashTable`] pages.
pub struct PagedTable<T> {
    shards: Box<[SpinLock<Shard<T>>]>,
    page_capacity: usize,
}

impl<T: Keyed> PagedTable<T> {
    /// Create `shard_count` shards of two `page_capacity`-slot pages each.
    pub fn new(shard_count: usize, page_capacity: usize) -> Result<Self> {
        if shard_count == 0 {
            return Err(Error::InvalidCapacity(
                "paged table needs at least one shard".into(),
            ));
        }
        let shards = (0..shard_count)
            .map(|_| -> Result<SpinLock<Shard<T>>> {
                Ok(SpinLock::new(Shard {
                    pages: [
                        HashTable::with_capacity(page_capacity)?,
                        HashTable::with_capacity(page_capacity)?,
                    ],
                    active: 0,
                }))
            })
            .collect::<Result<Vec<_>>>()?
            .into_boxed_slice();
        Ok(Self {
            shards,
            page_capacity,
        })
    }

    #[inline]
    fn shard(&self, shard: usize) -> Result<&SpinLock<Shard<T>>> {
        self.shards.get(shard).ok_or(Error::ShardOutOfRange {
            shard,
            shards: self.shards.len(),
        })
    }

    /// Insert into `shard`'s active page, rotating past the load threshold.
    pub fn insert(&self, shard: usize, value: T) -> Result<PageInsert> {
        let mut guard = self.shard(shard)?.lock();
        let active = guard.active;
        let page = &mut guard.pages[active];
        page.insert(value)?;

        if page.load_factor() <= ROTATION_LOAD_FACTOR {
            return Ok(PageInsert::Stored);
        }

        // TODO: hand the full page to a persistence consumer before clearing.
        let discarded = page.len();
        page.clear();
        guard.active = active ^ 1;

        Ok(PageInsert::Rotated {
            retired_page: self.physical(shard, active),
            active_page: self.physical(shard, active ^ 1),
            discarded,
        })
    }

    /// Whether any shard's active page holds `key`.
    pub fn has(&self, key: u64) -> bool {
        self.shards.iter().any(|s| {
            let guard = s.lock();
            guard.pages[guard.active].has(key)
        })
    }

    /// Copy of the value stored under `key` in any active page.
    pub fn get(&self, key: u64) -> Option<T>
    where
        T: Clone,
    {
        self.shards.iter().find_map(|s| {
            let guard = s.lock();
            guard.pages[guard.active].get(key).cloned()
        })
    }
}

impl<T> PagedTable<T> {
    #[inline]
    fn physical(&self, shard: usize, local: usize) -> usize {
        shard + local * self.shards.len()
    }

    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Physical index of the page currently receiving `shard`'s writes.
    pub fn active_page(&self, shard: usize) -> Option<usize> {
        let s = self.shards.get(shard)?;
        let active = s.lock().active;
        Some(self.physical(shard, active))
    }

    /// Live entries in `shard`'s active page.
    pub fn shard_len(&self, shard: usize) -> Option<usize> {
        let s = self.shards.get(shard)?;
        let guard = s.lock();
        Some(guard.pages[guard.active].len())
    }

    /// Live entries across all active pages (not atomic across shards).
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| {
                let guard = s.lock();
                guard.pages[guard.active].len()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
