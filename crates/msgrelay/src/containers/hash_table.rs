// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Open-addressing hash table keyed by a 64-bit identifier.
//!
//! # Probing
//!
//! The first index is `hash(key) & mask`. Each collision re-hashes the
//! running index plus an increasing step (`idx = hash(idx + step) & mask`),
//! giving a pseudo-random chain seeded by the previous index. The chain is
//! walked for at most `capacity` steps, then the table is swept linearly so
//! every slot stays reachable even when the chain cycles.
//!
//! # Slot states
//!
//! - `Empty`: never written since the last [`HashTable::clear`]; terminates lookups
//! - `Tombstone`: erased; skipped by lookups, reused by inserts
//! - `Occupied`: live value
//!
//! Lookups stop at the first `Empty` slot. That is only sound while the
//! table keeps spare empty slots, which the owning [`PagedTable`] guarantees
//! by rotating pages past a bounded load factor.
//!
//! Not thread-safe.
//!
//! [`PagedTable`]: super::PagedTable

use crate::error::{Error, Result};
use std::hash::{BuildHasher, BuildHasherDefault, Hasher};

/// Values stored in a [`HashTable`] expose their 64-bit key.
pub trait Keyed {
    fn key(&self) -> u64;
}

/// State of one table slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Slot<T> {
    #[default]
    Empty,
    Tombstone,
    Occupied(T),
}

impl<T> Slot<T> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone)
    }

    #[inline]
    pub fn occupied(&self) -> Option<&T> {
        match self {
            Self::Occupied(v) => Some(v),
            _ => None,
        }
    }
}

/// Integer hasher for identifier keys (splitmix64 finalizer).
///
/// Sequential ids spread across the whole index range, which keeps the
/// probe chains short for the typical per-sender counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdHasher {
    state: u64,
}

impl Hasher for IdHasher {
    #[inline]
    fn finish(&self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = (self.state.rotate_left(8) ^ u64::from(b)).wrapping_mul(0x0100_0000_01B3);
        }
    }

    #[inline]
    fn write_u64(&mut self, n: u64) {
        self.state ^= n;
    }

    #[inline]
    fn write_usize(&mut self, n: usize) {
        self.write_u64(n as u64);
    }
}

/// Fixed-capacity open-addressing table.
///
/// Capacity is a power of two fixed at construction; the table never grows.
#[derive(Debug, Clone)]
pub struct HashTable<T, S = BuildHasherDefault<IdHasher>> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    live: usize,
    hasher: S,
}

impl<T: Keyed> HashTable<T> {
    /// Create a table with `capacity` slots (power of two, non-zero).
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_hasher(capacity, BuildHasherDefault::default())
    }
}

impl<T: Keyed, S: BuildHasher> HashTable<T, S> {
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(Error::InvalidCapacity(format!(
                "hash table capacity must be a non-zero power of two, got {}",
                capacity
            )));
        }
        let slots = std::iter::repeat_with(|| Slot::Empty)
            .take(capacity)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            slots,
            mask: capacity - 1,
            live: 0,
            hasher,
        })
    }

    #[inline]
    fn index(&self, value: u64) -> usize {
        (self.hasher.hash_one(value) as usize) & self.mask
    }

    /// Slot indices visited for `key`: the re-hash chain, then a linear sweep.
    fn probe(&self, key: u64) -> impl Iterator<Item = usize> + '_ {
        let capacity = self.slots.len();
        let mut idx = self.index(key);
        let chain = (0..capacity).map(move |step| {
            if step > 0 {
                idx = self.index(idx.wrapping_add(step) as u64);
            }
            idx
        });
        chain.chain(0..capacity)
    }

    /// Position of the live slot holding `key`.
    pub fn position(&self, key: u64) -> Option<usize> {
        for idx in self.probe(key) {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied(v) if v.key() == key => return Some(idx),
                Slot::Tombstone | Slot::Occupied(_) => {}
            }
        }
        None
    }

    /// Insert or update by key.
    ///
    /// Returns the replaced value when the key was already present. The
    /// probe keeps scanning past tombstones for a live match, so an existing
    /// key is always updated in place; a new key lands in the first
    /// tombstone or empty slot encountered.
    pub fn insert(&mut self, value: T) -> Result<Option<T>> {
        let key = value.key();
        let mut landing = None;
        let mut existing = None;

        for idx in self.probe(key) {
            match &self.slots[idx] {
                Slot::Empty => {
                    landing.get_or_insert(idx);
                    break;
                }
                Slot::Tombstone => {
                    landing.get_or_insert(idx);
                }
                Slot::Occupied(v) if v.key() == key => {
                    existing = Some(idx);
                    break;
                }
                Slot::Occupied(_) => {}
            }
        }

        if let Some(idx) = existing {
            let old = std::mem::replace(&mut self.slots[idx], Slot::Occupied(value));
            return Ok(old.occupied_into());
        }

        let idx = landing.ok_or(Error::TableFull(self.slots.len()))?;
        self.slots[idx] = Slot::Occupied(value);
        self.live += 1;
        Ok(None)
    }

    #[inline]
    pub fn has(&self, key: u64) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: u64) -> Option<&T> {
        self.position(key).and_then(|idx| self.slots[idx].occupied())
    }

    pub fn get_mut(&mut self, key: u64) -> Option<&mut T> {
        let idx = self.position(key)?;
        match &mut self.slots[idx] {
            Slot::Occupied(v) => Some(v),
            _ => None,
        }
    }

    /// Mark the slot holding `key` as a tombstone. Never compacts.
    pub fn erase(&mut self, key: u64) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.slots[idx] = Slot::Tombstone;
                self.live -= 1;
                true
            }
            None => false,
        }
    }
}

impl<T, S> HashTable<T, S> {
    /// `live / capacity`.
    #[inline]
    pub fn load_factor(&self) -> f32 {
        self.live as f32 / self.slots.len() as f32
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn tombstones(&self) -> usize {
        self.slots.iter().filter(|s| s.is_tombstone()).count()
    }

    pub fn slot(&self, idx: usize) -> Option<&Slot<T>> {
        self.slots.get(idx)
    }

    /// Reset every slot to `Empty` in place, keeping the allocation.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.live = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Slot::occupied)
    }
}

impl<T> Slot<T> {
    fn occupied_into(self) -> Option<T> {
        match self {
            Self::Occupied(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Entry {
        id: u64,
        value: u32,
    }

    impl Keyed for Entry {
        fn key(&self) -> u64 {
            self.id
        }
    }

    fn entry(id: u64, value: u32) -> Entry {
        Entry { id, value }
    }

    /// Sends every key (and every re-hash) to slot 0.
    #[derive(Default)]
    struct ZeroHasher;

    impl Hasher for ZeroHasher {
        fn finish(&self) -> u64 {
            0
        }
        fn write(&mut self, _bytes: &[u8]) {}
    }

    fn collide() -> BuildHasherDefault<ZeroHasher> {
        BuildHasherDefault::default()
    }

    #[test]
    fn test_capacity_must_be_power_of_two() {
        assert!(HashTable::<Entry>::with_capacity(0).is_err());
        assert!(HashTable::<Entry>::with_capacity(1000).is_err());
        let table = HashTable::<Entry>::with_capacity(1024).unwrap();
        assert_eq!(table.capacity(), 1024);
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_then_get() {
        let mut table = HashTable::with_capacity(16).unwrap();
        assert_eq!(table.insert(entry(7, 1)).unwrap(), None);
        assert_eq!(table.get(7), Some(&entry(7, 1)));
        assert!(table.has(7));
        assert!(!table.has(8));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_existing_key_updates_in_place() {
        let mut table = HashTable::with_capacity(16).unwrap();
        table.insert(entry(3, 1)).unwrap();
        let pos = table.position(3).unwrap();
        assert_eq!(table.insert(entry(3, 2)).unwrap(), Some(entry(3, 1)));
        assert_eq!(table.position(3), Some(pos));
        assert_eq!(table.get(3).unwrap().value, 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_erase_then_get_not_found() {
        let mut table = HashTable::with_capacity(16).unwrap();
        table.insert(entry(11, 0)).unwrap();
        assert!(table.erase(11));
        assert_eq!(table.get(11), None);
        assert!(!table.erase(11));
        assert_eq!(table.len(), 0);
        assert_eq!(table.tombstones(), 1);
    }

    #[test]
    fn test_reinsert_reuses_tombstone() {
        let mut table = HashTable::with_capacity(64).unwrap();
        for id in 0..10 {
            table.insert(entry(id, 0)).unwrap();
        }
        let before = table.len();
        let pos = table.position(5).unwrap();

        assert!(table.erase(5));
        assert_eq!(table.len(), before - 1);
        assert!(table.slot(pos).unwrap().is_tombstone());

        table.insert(entry(5, 9)).unwrap();
        assert_eq!(table.position(5), Some(pos));
        assert_eq!(table.len(), before);
        assert_eq!(table.capacity(), 64);
        assert_eq!(table.tombstones(), 0);
    }

    #[test]
    fn test_lookup_skips_tombstones_in_chain() {
        let mut table = HashTable::with_capacity_and_hasher(8, collide()).unwrap();
        table.insert(entry(1, 0)).unwrap();
        table.insert(entry(2, 0)).unwrap();
        table.insert(entry(3, 0)).unwrap();

        // 1 sits at the head of the shared chain; its tombstone must not
        // hide 2 and 3 behind it.
        assert!(table.erase(1));
        assert!(table.has(2));
        assert!(table.has(3));
    }

    #[test]
    fn test_existing_key_behind_tombstone_is_updated_not_duplicated() {
        let mut table = HashTable::with_capacity_and_hasher(8, collide()).unwrap();
        table.insert(entry(1, 0)).unwrap();
        table.insert(entry(2, 0)).unwrap();
        assert!(table.erase(1));

        assert_eq!(table.insert(entry(2, 5)).unwrap(), Some(entry(2, 0)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().filter(|e| e.id == 2).count(), 1);
    }

    #[test]
    fn test_fill_completely_then_full() {
        let mut table = HashTable::with_capacity_and_hasher(8, collide()).unwrap();
        for id in 0..8 {
            table.insert(entry(id, 0)).unwrap();
        }
        for id in 0..8 {
            assert!(table.has(id), "key {} lost", id);
        }
        assert!(matches!(
            table.insert(entry(100, 0)),
            Err(Error::TableFull(8))
        ));
        assert!((table.load_factor() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_factor_and_clear() {
        let mut table = HashTable::with_capacity(16).unwrap();
        for id in 0..4 {
            table.insert(entry(id, 0)).unwrap();
        }
        assert!((table.load_factor() - 0.25).abs() < f32::EPSILON);

        table.clear();
        assert_eq!(table.len(), 0);
        assert_eq!(table.load_factor(), 0.0);
        assert_eq!(table.iter().count(), 0);
        assert!(table.slot(0).unwrap().is_empty());
    }

    #[test]
    fn test_get_mut() {
        let mut table = HashTable::with_capacity(16).unwrap();
        table.insert(entry(4, 1)).unwrap();
        table.get_mut(4).unwrap().value = 8;
        assert_eq!(table.get(4).unwrap().value, 8);
        assert!(table.get_mut(5).is_none());
    }

    #[test]
    fn test_many_keys_at_high_load() {
        let mut table = HashTable::with_capacity(1024).unwrap();
        let mut rng = fastrand::Rng::with_seed(7);
        let keys: Vec<u64> = (0..800).map(|_| rng.u64(..)).collect();
        for &k in &keys {
            table.insert(entry(k, 0)).unwrap();
        }
        for &k in &keys {
            assert!(table.has(k));
        }
        for &k in keys.iter().step_by(2) {
            assert!(table.erase(k));
        }
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(table.has(k), i % 2 == 1);
        }
    }
}
