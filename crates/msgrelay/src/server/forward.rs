// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Forwarding worker: drains the relay queue into the relay sink.
//!
//! An empty queue parks the worker on the wake notifier for
//! `forward_wait` instead of spinning. On shutdown whatever is still queued
//! is flushed before the connection is closed.

use super::stats::ServerMetrics;
use super::Shared;
use crate::message::Message;
use crate::transport::{RelaySink, Transport};
use std::sync::atomic::Ordering;

pub(super) fn run_worker<T: Transport + ?Sized>(shared: &Shared, transport: &T) {
    relay(shared, transport);
    shared.relay_alive.store(false, Ordering::Release);
}

fn relay<T: Transport + ?Sized>(shared: &Shared, transport: &T) {
    let mut sink = match transport.open_relay() {
        Ok(sink) => sink,
        Err(e) => {
            log::warn!("[FORWARD] relay connect failed: {}", e);
            return;
        }
    };
    if !shared.wait_running() {
        let _ = sink.shutdown();
        return;
    }
    log::debug!("[FORWARD] started");

    let wait = shared.config.forward_wait();
    while shared.is_running() {
        match next(shared) {
            Some(msg) => {
                if !send(shared, sink.as_mut(), &msg) {
                    return;
                }
            }
            None => {
                shared.wake.wait_timeout(wait);
            }
        }
    }

    while let Some(msg) = next(shared) {
        if !send(shared, sink.as_mut(), &msg) {
            return;
        }
    }
    let _ = sink.shutdown();
    log::debug!("[FORWARD] exiting");
}

/// Check and pop under one queue lock acquisition.
fn next(shared: &Shared) -> Option<Message> {
    let mut queue = shared.queue.lock();
    if queue.is_empty() {
        return None;
    }
    queue.pop()
}

/// Returns `false` after a send failure closed the sink.
fn send(shared: &Shared, sink: &mut dyn RelaySink, msg: &Message) -> bool {
    match sink.send(&msg.encode()) {
        Ok(_) => {
            ServerMetrics::bump(&shared.metrics.relayed);
            log::debug!("[FORWARD] relayed {}", msg);
            true
        }
        Err(e) => {
            log::warn!("[FORWARD] send failed, closing relay: {}", e);
            let _ = sink.shutdown();
            false
        }
    }
}
