// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Relay server: worker orchestration and the idle watchdog.
//!
//! [`Server::run`] spawns one ingestion worker per shard plus a single
//! forwarder, flips the state to [`RunState::Running`], then blocks the
//! calling thread on the watchdog. The watchdog stops the server once no new
//! message has been accepted for `idle_timeout`, or when a [`ServerHandle`]
//! requests it. Workers observe the state once per loop iteration and are
//! joined before `run` returns.
//!
//! ```text
//! ingest[i]: receive -> decode -> window (shared lock) -> table[i] -> queue?
//! forward:   queue (shared lock) -> encode -> relay sink
//! ```
//!
//! A worker that hits a fatal transport error exits on its own. The watchdog
//! cannot tell "no traffic" from "every receiver died", so the server keeps
//! running until the idle timeout either way. Once the forwarder is gone,
//! targeted messages are still stored but no longer queued.

mod forward;
mod ingest;
mod stats;

pub use stats::ServerStats;

use crate::config::ServerConfig;
use crate::containers::{PageInsert, PagedTable, Queue, SlidingWindow};
use crate::error::{Error, Result};
use crate::message::{Message, MsgId};
use crate::sync::{SpinLock, WakeNotifier};
use crate::transport::Transport;
use stats::ServerMetrics;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted watchdog sleep, so `stop()` is observed promptly.
const WATCHDOG_SLICE: Duration = Duration::from_millis(50);

/// Server lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    NotStarted = 0,
    Running = 1,
    /// Terminal.
    Stopped = 2,
}

impl RunState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RunState::NotStarted,
            1 => RunState::Running,
            _ => RunState::Stopped,
        }
    }
}

/// Why [`Server::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No message accepted within the idle timeout.
    Idle,
    /// [`ServerHandle::stop`] was called.
    Requested,
}

/// Summary returned by [`Server::run`] after all workers are joined.
#[derive(Debug, Clone, Copy)]
pub struct ServerReport {
    pub stats: ServerStats,
    pub reason: StopReason,
    pub elapsed: Duration,
}

/// What happened to one decoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ingest {
    Duplicate,
    Stored,
    Relayed,
}

/// State shared by the watchdog and every worker.
pub(crate) struct Shared {
    config: ServerConfig,
    state: AtomicU8,
    started: AtomicBool,
    window: SpinLock<SlidingWindow>,
    table: PagedTable<Message>,
    queue: SpinLock<Queue<Message>>,
    /// Cleared when the forwarder exits; nothing drains the queue after that.
    relay_alive: AtomicBool,
    wake: WakeNotifier,
    metrics: ServerMetrics,
    epoch: Instant,
    /// Milliseconds since `epoch` at the last accepted message.
    last_accept_ms: AtomicU64,
}

impl Shared {
    fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let window = SlidingWindow::new(config.window_capacity)?;
        let table = PagedTable::new(config.receivers, config.page_capacity)?;
        Ok(Self {
            config,
            state: AtomicU8::new(RunState::NotStarted as u8),
            started: AtomicBool::new(false),
            window: SpinLock::new(window),
            table,
            queue: SpinLock::new(Queue::new()),
            relay_alive: AtomicBool::new(true),
            wake: WakeNotifier::new(),
            metrics: ServerMetrics::default(),
            epoch: Instant::now(),
            last_accept_ms: AtomicU64::new(0),
        })
    }

    #[inline]
    fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// NotStarted -> Running; fails if a stop already landed.
    fn enter_running(&self) -> bool {
        self.state
            .compare_exchange(
                RunState::NotStarted as u8,
                RunState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn halt(&self) {
        self.state.store(RunState::Stopped as u8, Ordering::Release);
        self.wake.notify();
    }

    /// Spin until the server leaves NotStarted; `false` if it went straight to Stopped.
    fn wait_running(&self) -> bool {
        loop {
            match self.state() {
                RunState::NotStarted => std::hint::spin_loop(),
                RunState::Running => return true,
                RunState::Stopped => return false,
            }
        }
    }

    fn touch(&self) {
        let now = self.epoch.elapsed().as_millis() as u64;
        self.last_accept_ms.store(now, Ordering::Relaxed);
    }

    fn idle(&self) -> Duration {
        let now = self.epoch.elapsed().as_millis() as u64;
        Duration::from_millis(now.saturating_sub(self.last_accept_ms.load(Ordering::Relaxed)))
    }

    /// Filter, store, and possibly enqueue one message received on `shard`.
    pub(crate) fn ingest(&self, shard: usize, msg: Message) -> Result<Ingest> {
        let accepted = self.window.lock().insert(msg.id);
        if !accepted {
            ServerMetrics::bump(&self.metrics.duplicates);
            return Ok(Ingest::Duplicate);
        }
        ServerMetrics::bump(&self.metrics.accepted);

        if let PageInsert::Rotated {
            retired_page,
            active_page,
            discarded,
        } = self.table.insert(shard, msg)?
        {
            log::debug!(
                "[PAGES] shard={} rotated page {} -> {} discarded={}",
                shard,
                retired_page,
                active_page,
                discarded
            );
            ServerMetrics::bump(&self.metrics.rotations);
            self.metrics
                .discarded
                .fetch_add(discarded as u64, Ordering::Relaxed);
        }
        self.touch();

        if msg.data != self.config.relay_target || !self.relay_alive.load(Ordering::Acquire) {
            return Ok(Ingest::Stored);
        }
        self.queue.lock().push(msg);
        self.wake.notify();
        Ok(Ingest::Relayed)
    }

    /// Block until idle timeout or stop request, then mark Stopped.
    fn watchdog(&self) -> StopReason {
        let interval = self.config.watchdog_interval();
        let idle_timeout = self.config.idle_timeout();
        loop {
            let deadline = Instant::now() + interval;
            loop {
                if self.state() == RunState::Stopped {
                    log::info!("[SERVER] stop requested");
                    return StopReason::Requested;
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                thread::sleep(remaining.min(WATCHDOG_SLICE));
            }

            let idle = self.idle();
            if idle > idle_timeout {
                log::info!("[SERVER] idle for {:?}, stopping", idle);
                self.halt();
                return StopReason::Idle;
            }
            log::debug!("[SERVER] watchdog idle={:?}", idle);
        }
    }
}

/// The relay server.
pub struct Server {
    shared: Arc<Shared>,
}

impl Server {
    /// Validate `config` and allocate the window, table, and queue.
    pub fn new(config: ServerConfig) -> Result<Self> {
        Ok(Self {
            shared: Arc::new(Shared::new(config)?),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    pub fn stats(&self) -> ServerStats {
        self.shared.metrics.snapshot()
    }

    /// Stored copy of `id`, searching every shard's active page.
    pub fn lookup(&self, id: MsgId) -> Option<Message> {
        self.shared.table.get(id)
    }

    pub fn contains(&self, id: MsgId) -> bool {
        self.shared.table.has(id)
    }

    /// Run until the idle watchdog or a [`ServerHandle`] stops the server.
    ///
    /// Can be called once; the server is Stopped afterwards.
    pub fn run<T: Transport + ?Sized>(&self, transport: &T) -> Result<ServerReport> {
        let shared = &*self.shared;
        if shared.started.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyStarted);
        }
        let started_at = Instant::now();
        let receivers = shared.config.receivers;

        let reason = thread::scope(|scope| -> Result<StopReason> {
            let spawned = (0..receivers)
                .try_for_each(|shard| {
                    thread::Builder::new()
                        .name(format!("msgrelay-ingest-{}", shard))
                        .spawn_scoped(scope, move || ingest::run_worker(shared, transport, shard))
                        .map(drop)
                })
                .and_then(|()| {
                    thread::Builder::new()
                        .name("msgrelay-forward".into())
                        .spawn_scoped(scope, move || forward::run_worker(shared, transport))
                        .map(drop)
                });
            if let Err(e) = spawned {
                log::warn!("[SERVER] failed to spawn worker: {}", e);
                shared.halt();
                return Err(Error::Io(e));
            }

            if !shared.enter_running() {
                return Ok(StopReason::Requested);
            }
            shared.touch();
            log::info!(
                "[SERVER] running receivers={} relay_target={}",
                receivers,
                shared.config.relay_target
            );
            Ok(shared.watchdog())
        })?;

        let stats = shared.metrics.snapshot();
        log::info!(
            "[SERVER] stopped reason={:?} accepted={} duplicates={} relayed={}",
            reason,
            stats.accepted,
            stats.duplicates,
            stats.relayed
        );
        Ok(ServerReport {
            stats,
            reason,
            elapsed: started_at.elapsed(),
        })
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shared.halt();
    }
}

/// Cloneable control handle, usable from any thread.
#[derive(Clone)]
pub struct ServerHandle {
    shared: Arc<Shared>,
}

impl ServerHandle {
    /// Request shutdown; `run` returns once the workers are joined.
    pub fn stop(&self) {
        self.shared.halt();
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    pub fn stats(&self) -> ServerStats {
        self.shared.metrics.snapshot()
    }
}
