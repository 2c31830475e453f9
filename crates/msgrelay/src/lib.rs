// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # msgrelay - UDP deduplication and TCP relay engine
//!
//! Ingests fixed-format messages from several duplicate-prone UDP sources,
//! filters duplicates through a shared recency window, stores accepted
//! messages in a lock-striped double-buffered table, and relays a selected
//! subset over a single TCP connection in order of acceptance.
//!
//! ## Architecture
//!
//! ```text
//! +-----------+   +-----------+        +----------------+
//! | UDP shard |   | UDP shard |  ...   |  (N receivers) |
//! +-----+-----+   +-----+-----+        +----------------+
//!       |               |
//!       v               v
//! +----------------------------------+
//! | SlidingWindow  (one SpinLock)    |  duplicate filter
//! +----------------------------------+
//!       |               |
//!       v               v
//! +-------------+ +-------------+
//! | shard page  | | shard page  |     PagedTable (SpinLock per shard)
//! +-------------+ +-------------+
//!       |               |
//!       +-------+-------+
//!               v   data == relay_target
//!     +-------------------+
//!     | Queue (SpinLock)  | ---> forwarder ---> TCP relay
//!     +-------------------+
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use msgrelay::{NetTransport, Server, ServerConfig};
//!
//! fn main() -> msgrelay::Result<()> {
//!     let config = ServerConfig::default();
//!     let transport = NetTransport::new(&config);
//!     let report = Server::new(config)?.run(&transport)?;
//!     println!("duplicates filtered: {}", report.stats.duplicates);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules Overview
//!
//! - [`sync`] - busy-wait lock and wake notifier
//! - [`containers`] - hash table, sliding window, queue, paged table
//! - [`message`] - 19-byte wire record
//! - [`transport`] - capability interface plus network and in-memory backends
//! - [`server`] - worker orchestration and idle watchdog
//! - [`config`] - server configuration

pub mod config;
pub mod containers;
pub mod error;
pub mod message;
pub mod server;
pub mod sync;
pub mod transport;

pub use config::{ConfigError, ServerConfig};
pub use containers::{HashTable, PageInsert, PagedTable, Queue, SlidingWindow, Slot};
pub use error::{Error, Result};
pub use message::{Message, MsgId, MESSAGE_WIRE_SIZE};
pub use server::{RunState, Server, ServerHandle, ServerReport, ServerStats, StopReason};
pub use sync::{SpinLock, SpinLockGuard, WakeNotifier};
pub use transport::{
    DatagramSource, MemoryRelay, MemoryTransport, NetTransport, RelayConnection, RelayListener,
    RelaySink, Transport, UdpSender,
};
