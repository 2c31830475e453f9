// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport capability interface.
//!
//! The server never touches sockets directly. It asks a [`Transport`] for one
//! [`DatagramSource`] per shard and one [`RelaySink`] for the forwarder, so
//! the network backend and the in-memory backend are interchangeable.
//!
//! # Receive contract
//!
//! `DatagramSource::receive` returns:
//! - `Ok(n)` with `n > 0` - a datagram of `n` bytes was copied into `buf`
//! - `Ok(0)` - the receive timed out, retry
//! - `Err(_)` - fatal, the owning worker exits

pub mod memory;
pub mod tcp;
pub mod udp;

pub use memory::{MemoryRelay, MemoryTransport};
pub use tcp::{RelayConnection, RelayListener, TcpRelaySink};
pub use udp::{NetTransport, UdpSender, UdpSource};

use std::io;

/// Receiving half of one ingestion shard.
pub trait DatagramSource: Send {
    /// Receive one datagram into `buf` (see the module-level contract).
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Outbound reliable connection used by the forwarder.
pub trait RelaySink: Send {
    /// Send all of `buf`; returns the number of bytes written.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Close the connection. Errors are ignored by callers.
    fn shutdown(&mut self) -> io::Result<()>;
}

/// Factory for per-shard receivers and the relay connection.
pub trait Transport: Send + Sync {
    fn open_receiver(&self, shard: usize) -> io::Result<Box<dyn DatagramSource>>;

    fn open_relay(&self) -> io::Result<Box<dyn RelaySink>>;
}

/// Map timeout-flavoured errors to the `Ok(0)` retry signal.
pub(crate) fn timeout_as_empty(result: io::Result<usize>) -> io::Result<usize> {
    match result {
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            ) =>
        {
            Ok(0)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_as_empty() {
        let would_block = Err(io::Error::from(io::ErrorKind::WouldBlock));
        assert_eq!(timeout_as_empty(would_block).unwrap(), 0);
        let timed_out = Err(io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(timeout_as_empty(timed_out).unwrap(), 0);
        assert_eq!(timeout_as_empty(Ok(19)).unwrap(), 19);

        let fatal = Err(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(timeout_as_empty(fatal).is_err());
    }
}
