// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport on crossbeam channels.
//!
//! Each shard gets an inbox channel of raw datagrams; the relay side is a
//! single channel drained through [`MemoryRelay`]. Datagrams keep their
//! boundaries, so a short inject reaches the server as a short datagram.

use super::{DatagramSource, RelaySink, Transport};
use crate::message::{Message, MESSAGE_WIRE_SIZE};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::io;
use std::time::Duration;

/// Channel-backed [`Transport`].
#[derive(Debug)]
pub struct MemoryTransport {
    inboxes: Vec<(Sender<Vec<u8>>, Receiver<Vec<u8>>)>,
    relay_tx: Sender<Vec<u8>>,
    relay_rx: Receiver<Vec<u8>>,
    receive_timeout: Duration,
}

impl MemoryTransport {
    /// Create `shards` inboxes; receivers poll them every `receive_timeout`.
    pub fn new(shards: usize, receive_timeout: Duration) -> Self {
        let inboxes = (0..shards).map(|_| channel::unbounded()).collect();
        let (relay_tx, relay_rx) = channel::unbounded();
        Self {
            inboxes,
            relay_tx,
            relay_rx,
            receive_timeout,
        }
    }

    #[inline]
    pub fn shards(&self) -> usize {
        self.inboxes.len()
    }

    /// Queue a raw datagram for `shard`. Returns `false` for an unknown shard.
    pub fn inject(&self, shard: usize, datagram: &[u8]) -> bool {
        match self.inboxes.get(shard) {
            Some((tx, _)) => tx.send(datagram.to_vec()).is_ok(),
            None => false,
        }
    }

    /// Encode and queue `msg` for `shard`.
    pub fn inject_message(&self, shard: usize, msg: &Message) -> bool {
        self.inject(shard, &msg.encode())
    }

    /// Sending handle for `shard`, for producers on other threads.
    pub fn sender(&self, shard: usize) -> Option<Sender<Vec<u8>>> {
        self.inboxes.get(shard).map(|(tx, _)| tx.clone())
    }

    /// Downstream view of everything the forwarder sent.
    pub fn relay(&self) -> MemoryRelay {
        MemoryRelay {
            rx: self.relay_rx.clone(),
        }
    }
}

impl Transport for MemoryTransport {
    fn open_receiver(&self, shard: usize) -> io::Result<Box<dyn DatagramSource>> {
        let (_, rx) = self.inboxes.get(shard).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no memory inbox for shard {}", shard),
            )
        })?;
        Ok(Box::new(MemorySource {
            rx: rx.clone(),
            timeout: self.receive_timeout,
        }))
    }

    fn open_relay(&self) -> io::Result<Box<dyn RelaySink>> {
        Ok(Box::new(MemorySink {
            tx: Some(self.relay_tx.clone()),
        }))
    }
}

struct MemorySource {
    rx: Receiver<Vec<u8>>,
    timeout: Duration,
}

impl DatagramSource for MemorySource {
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.rx.recv_timeout(self.timeout) {
            Ok(datagram) => {
                // Oversized datagrams are truncated like a UDP recv.
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(n)
            }
            Err(RecvTimeoutError::Timeout) => Ok(0),
            Err(RecvTimeoutError::Disconnected) => Err(io::ErrorKind::BrokenPipe.into()),
        }
    }
}

struct MemorySink {
    tx: Option<Sender<Vec<u8>>>,
}

impl RelaySink for MemorySink {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        tx.send(buf.to_vec())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.tx = None;
        Ok(())
    }
}

/// Receiving end of the in-memory relay channel.
#[derive(Debug, Clone)]
pub struct MemoryRelay {
    rx: Receiver<Vec<u8>>,
}

impl MemoryRelay {
    /// Wait up to `timeout` for the next relayed message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        let frame = self.rx.recv_timeout(timeout).ok()?;
        Message::decode(&frame).ok()
    }

    /// Every message relayed so far, in send order.
    pub fn drain(&self) -> Vec<Message> {
        self.rx
            .try_iter()
            .filter(|frame| frame.len() == MESSAGE_WIRE_SIZE)
            .filter_map(|frame| Message::decode(&frame).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_and_receive() {
        let transport = MemoryTransport::new(2, Duration::from_millis(10));
        let mut source = transport.open_receiver(1).unwrap();
        let msg = Message::new(19, 2, 7, 10);
        assert!(transport.inject_message(1, &msg));
        assert!(!transport.inject(2, &[0u8; 4]));

        let mut buf = [0u8; 64];
        let n = source.receive(&mut buf).unwrap();
        assert_eq!(n, MESSAGE_WIRE_SIZE);
        assert_eq!(Message::decode(&buf[..n]).unwrap(), msg);

        // Nothing left: timeout yields zero.
        assert_eq!(source.receive(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_unknown_shard_rejected() {
        let transport = MemoryTransport::new(1, Duration::from_millis(10));
        assert!(transport.open_receiver(3).is_err());
    }

    #[test]
    fn test_relay_round_trip_and_shutdown() {
        let transport = MemoryTransport::new(1, Duration::from_millis(10));
        let relay = transport.relay();
        let mut sink = transport.open_relay().unwrap();

        sink.send(&Message::new(19, 1, 1, 10).encode()).unwrap();
        sink.send(&Message::new(19, 1, 2, 10).encode()).unwrap();
        let ids: Vec<_> = relay.drain().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);

        sink.shutdown().unwrap();
        assert!(sink.send(&[0u8; MESSAGE_WIRE_SIZE]).is_err());
    }
}
