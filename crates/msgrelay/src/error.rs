// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the relay engine.

use crate::config::ConfigError;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Relay engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A container was asked for a capacity it cannot honour.
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    /// Shard index outside `0..shard_count`.
    #[error("Shard {shard} out of range (shards: {shards})")]
    ShardOutOfRange { shard: usize, shards: usize },

    /// Every slot of a hash table is occupied.
    #[error("Hash table full (capacity {0})")]
    TableFull(usize),

    /// Buffer shorter than a wire message.
    #[error("Truncated message: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// `run` called on a server that already left `NotStarted`.
    #[error("Server already started")]
    AlreadyStarted,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
