// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion worker, one per shard.

use super::stats::ServerMetrics;
use super::{Ingest, Shared};
use crate::message::{Message, MESSAGE_WIRE_SIZE};
use crate::transport::Transport;

/// Receive buffer; larger datagrams are truncated and decode from the front.
const RECEIVE_BUFFER_SIZE: usize = 64;

pub(super) fn run_worker<T: Transport + ?Sized>(shared: &Shared, transport: &T, shard: usize) {
    let mut source = match transport.open_receiver(shard) {
        Ok(source) => source,
        Err(e) => {
            log::warn!("[INGEST] shard={} receiver unavailable: {}", shard, e);
            return;
        }
    };
    if !shared.wait_running() {
        return;
    }
    log::debug!("[INGEST] shard={} started", shard);

    let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
    while shared.is_running() {
        let len = match source.receive(&mut buf) {
            Ok(0) => {
                log::trace!("[INGEST] shard={} receive timeout", shard);
                continue;
            }
            Ok(len) => len,
            Err(e) => {
                log::warn!("[INGEST] shard={} receive failed, exiting: {}", shard, e);
                return;
            }
        };

        if len < MESSAGE_WIRE_SIZE {
            log::debug!("[INGEST] shard={} malformed datagram len={}", shard, len);
            ServerMetrics::bump(&shared.metrics.malformed);
            continue;
        }
        let msg = match Message::decode(&buf[..len]) {
            Ok(msg) => msg,
            Err(e) => {
                log::debug!("[INGEST] shard={} decode failed: {}", shard, e);
                ServerMetrics::bump(&shared.metrics.malformed);
                continue;
            }
        };

        match shared.ingest(shard, msg) {
            Ok(Ingest::Duplicate) => {
                log::trace!("[INGEST] shard={} duplicate id={}", shard, msg.id);
            }
            Ok(outcome) => {
                log::debug!("[INGEST] shard={} {:?} {}", shard, outcome, msg);
            }
            Err(e) => log::warn!("[INGEST] shard={} store failed id={}: {}", shard, msg.id, e),
        }
    }
    log::debug!("[INGEST] shard={} exiting", shard);
}
