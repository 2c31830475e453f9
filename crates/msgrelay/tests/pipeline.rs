// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! End-to-end server tests over the in-memory transport.
//!
//! Every datagram is queued before `run`, so the workers drain their inboxes
//! immediately and the idle watchdog ends the run about a second later.

use msgrelay::{
    DatagramSource, MemoryTransport, Message, RelaySink, Server, ServerConfig, StopReason,
    Transport,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TARGET: u64 = 10;

fn test_config(receivers: usize) -> ServerConfig {
    ServerConfig {
        receivers,
        relay_target: TARGET,
        window_capacity: 1024,
        page_capacity: 1024,
        receive_timeout_ms: 10,
        watchdog_interval_ms: 50,
        idle_timeout_secs: 1,
        forward_wait_ms: 5,
        ..Default::default()
    }
}

/// Every fourth id is selected for relay.
fn message(id: u64) -> Message {
    let data = if id % 4 == 0 { TARGET } else { id % 9 + 11 };
    Message::new(19, (id % 90 + 10) as u8, id, data)
}

/// Fresh ids with the current id re-sent after every tenth.
fn stream(ids: std::ops::Range<u64>) -> Vec<Message> {
    let mut out = Vec::new();
    for id in ids {
        out.push(message(id));
        if id % 10 == 9 {
            out.push(message(id));
        }
    }
    out
}

#[test]
fn test_two_shards_dedup_and_relay() {
    let config = test_config(2);
    let transport = MemoryTransport::new(2, config.receive_timeout());
    let relay = transport.relay();

    let shard0 = stream(0..200);
    // Cross-shard repeats of unselected shard-0 ids.
    let mut shard1: Vec<Message> = [1, 2, 3, 5].into_iter().map(message).collect();
    shard1.extend(stream(1000..1200));

    for msg in &shard0 {
        assert!(transport.inject_message(0, msg));
    }
    for msg in &shard1 {
        assert!(transport.inject_message(1, msg));
    }
    assert!(transport.inject(0, &[1, 2, 3]));

    let server = Server::new(config).unwrap();
    let report = server.run(&transport).unwrap();

    assert_eq!(report.reason, StopReason::Idle);
    let stats = report.stats;
    let sent = (shard0.len() + shard1.len()) as u64;
    assert_eq!(stats.accepted, 400);
    assert_eq!(stats.duplicates, sent - 400);
    assert_eq!(stats.duplicates, 44);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.rotations, 0);

    let relayed = relay.drain();
    assert_eq!(stats.relayed, relayed.len() as u64);
    assert!(relayed.iter().all(|m| m.data == TARGET));

    let from0: Vec<u64> = relayed.iter().map(|m| m.id).filter(|&id| id < 1000).collect();
    let from1: Vec<u64> = relayed.iter().map(|m| m.id).filter(|&id| id >= 1000).collect();
    assert_eq!(from0, (0..200).step_by(4).collect::<Vec<_>>());
    assert_eq!(from1, (1000..1200).step_by(4).collect::<Vec<_>>());

    for id in (0..200).chain(1000..1200) {
        assert_eq!(server.lookup(id), Some(message(id)), "id {}", id);
    }
    assert!(!server.contains(500));
}

#[test]
fn test_rotation_discards_oldest_page() {
    let config = ServerConfig {
        window_capacity: 64,
        page_capacity: 16,
        ..test_config(1)
    };
    let transport = MemoryTransport::new(1, config.receive_timeout());
    for id in 0..20 {
        transport.inject_message(0, &message(id));
    }

    let server = Server::new(config).unwrap();
    let report = server.run(&transport).unwrap();

    // 13/16 crosses 0.8: ids 0..13 are dropped, the rest land on the twin page.
    assert_eq!(report.stats.accepted, 20);
    assert_eq!(report.stats.rotations, 1);
    assert_eq!(report.stats.discarded, 13);
    for id in 0..13 {
        assert!(!server.contains(id), "id {} survived rotation", id);
    }
    for id in 13..20 {
        assert!(server.contains(id));
    }
}

/// Memory transport whose relay can never be reached.
struct Unreachable(MemoryTransport);

impl Transport for Unreachable {
    fn open_receiver(&self, shard: usize) -> io::Result<Box<dyn DatagramSource>> {
        self.0.open_receiver(shard)
    }

    fn open_relay(&self) -> io::Result<Box<dyn RelaySink>> {
        Err(io::ErrorKind::ConnectionRefused.into())
    }
}

#[test]
fn test_relay_failure_leaves_ingestion_running() {
    let config = test_config(1);
    let transport = Unreachable(MemoryTransport::new(1, config.receive_timeout()));
    for id in 0..8 {
        transport.0.inject_message(0, &message(id));
    }

    let server = Server::new(config).unwrap();
    let report = server.run(&transport).unwrap();

    assert_eq!(report.stats.accepted, 8);
    assert_eq!(report.stats.relayed, 0);
    assert!(server.contains(4));
}

/// Relay sink whose every send fails.
struct BrokenSink(Arc<AtomicUsize>);

impl RelaySink for BrokenSink {
    fn send(&mut self, _buf: &[u8]) -> io::Result<usize> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Receiver whose first receive fails.
struct DeadSource;

impl DatagramSource for DeadSource {
    fn receive(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::ErrorKind::ConnectionReset.into())
    }
}

/// Shard 1 dies on its first receive, and the relay fails its first send.
struct Faulty {
    inner: MemoryTransport,
    sends: Arc<AtomicUsize>,
}

impl Transport for Faulty {
    fn open_receiver(&self, shard: usize) -> io::Result<Box<dyn DatagramSource>> {
        if shard == 1 {
            return Ok(Box::new(DeadSource));
        }
        self.inner.open_receiver(shard)
    }

    fn open_relay(&self) -> io::Result<Box<dyn RelaySink>> {
        Ok(Box::new(BrokenSink(Arc::clone(&self.sends))))
    }
}

#[test]
fn test_io_failures_end_only_the_failing_worker() {
    let config = test_config(2);
    let transport = Faulty {
        inner: MemoryTransport::new(2, config.receive_timeout()),
        sends: Arc::new(AtomicUsize::new(0)),
    };
    let ids: Vec<u64> = (0..6).map(|i| i * 4).collect();
    for &id in &ids {
        assert!(transport.inner.inject_message(0, &message(id)));
    }

    let server = Server::new(config).unwrap();
    let report = server.run(&transport).unwrap();

    assert_eq!(report.reason, StopReason::Idle);
    assert_eq!(report.stats.accepted, 6);
    assert_eq!(report.stats.relayed, 0);
    assert_eq!(transport.sends.load(Ordering::SeqCst), 1);
    for &id in &ids {
        assert!(server.contains(id), "id {} not stored", id);
    }
}

#[test]
fn test_idle_server_stops_without_traffic() {
    let config = test_config(2);
    let transport = MemoryTransport::new(2, config.receive_timeout());
    let server = Server::new(config).unwrap();

    let report = server.run(&transport).unwrap();
    assert_eq!(report.reason, StopReason::Idle);
    assert_eq!(report.stats, Default::default());
    assert!(report.elapsed >= Duration::from_secs(1));
    assert!(transport.relay().drain().is_empty());
}
