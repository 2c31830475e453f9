// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Storage and filtering containers.
//!
//! Only [`PagedTable`] is safe to share between threads; the other containers
//! are single-threaded and the server serializes access with a [`SpinLock`].
//!
//! [`SpinLock`]: crate::sync::SpinLock

/// Open-addressing table with tombstones.
pub mod hash_table;
/// Double-buffered, lock-striped table of [`HashTable`] pages.
pub mod paged_table;
/// Unbounded singly-linked FIFO.
pub mod queue;
/// Fixed-size recency window for message ids.
pub mod sliding_window;

pub use hash_table::{HashTable, IdHasher, Keyed, Slot};
pub use paged_table::{PageInsert, PagedTable, ROTATION_LOAD_FACTOR};
pub use queue::Queue;
pub use sliding_window::SlidingWindow;
