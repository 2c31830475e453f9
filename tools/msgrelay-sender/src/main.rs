// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! msgrelay-sender - UDP load generator
//!
//! Spawns one sender per ingestion port. Senders draw fresh ids from one
//! shared counter and re-send their latest message after every
//! `--dup-every` fresh ones, so the server sees in-shard duplicates.

use clap::Parser;
use msgrelay::{Message, SpinLock, UdpSender};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TEMPLATE_POOL: usize = 8;

/// msgrelay UDP load generator
#[derive(Parser, Debug)]
#[command(name = "msgrelay-sender")]
#[command(version = "0.1.0")]
#[command(about = "Send duplicate-prone message streams to a msgrelay server")]
struct Args {
    /// Server host
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// First UDP port; sender i targets base + i
    #[arg(short = 'p', long, default_value = "10100")]
    base_port: u16,

    /// Number of sender threads
    #[arg(short = 'n', long, default_value = "2")]
    senders: u16,

    /// Total fresh ids to send across all senders
    #[arg(short = 'm', long, default_value = "100")]
    packets: u64,

    /// Re-send the latest message after this many fresh ones (0 = never)
    #[arg(short, long, default_value = "10")]
    dup_every: u32,

    /// Pause between packets (milliseconds)
    #[arg(short, long, default_value = "2")]
    interval_ms: u64,

    /// Seed for the template generator
    #[arg(short, long)]
    seed: Option<u64>,
}

/// Shared id and template cursor.
struct IdSource {
    next_id: u64,
    pool_idx: usize,
    issued: u64,
}

struct Client {
    ids: SpinLock<IdSource>,
    templates: [Message; TEMPLATE_POOL],
    packets: u64,
    dup_every: u32,
    interval: Duration,
    running: AtomicBool,
    sent: AtomicU64,
    duplicates: AtomicU64,
}

impl Client {
    fn new(rng: &mut fastrand::Rng, packets: u64, dup_every: u32, interval: Duration) -> Self {
        let templates = std::array::from_fn(|_| {
            Message::new(rng.u16(10..100), rng.u8(10..100), 0, rng.u64(5..15))
        });
        Self {
            ids: SpinLock::new(IdSource {
                next_id: 0,
                pool_idx: 0,
                issued: 0,
            }),
            templates,
            packets,
            dup_every,
            interval,
            running: AtomicBool::new(true),
            sent: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
        }
    }

    /// Next fresh message, or `None` once `packets` ids were issued.
    fn next_fresh(&self) -> Option<Message> {
        let mut ids = self.ids.lock();
        if ids.issued >= self.packets {
            return None;
        }
        let id = ids.next_id;
        let idx = ids.pool_idx & (TEMPLATE_POOL - 1);
        ids.next_id += 1;
        ids.pool_idx = ids.pool_idx.wrapping_add(1);
        ids.issued += 1;
        drop(ids);

        let mut msg = self.templates[idx];
        msg.id = id;
        Some(msg)
    }

    fn send(&self, sender: &UdpSender, msg: &Message) -> io::Result<()> {
        sender.send(&msg.encode())?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        log::debug!("Sent to {}: {}", sender.target(), msg);
        Ok(())
    }

    fn run_sender(&self, sender: &UdpSender) -> io::Result<()> {
        let mut since_dup = 0u32;
        while self.running.load(Ordering::Relaxed) {
            let Some(msg) = self.next_fresh() else {
                break;
            };
            self.send(sender, &msg)?;
            since_dup += 1;

            if self.dup_every > 0 && since_dup >= self.dup_every {
                since_dup = 0;
                self.send(sender, &msg)?;
                self.duplicates.fetch_add(1, Ordering::Relaxed);
            }
            spin_sleep::sleep(self.interval);
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = match args.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let client = Arc::new(Client::new(
        &mut rng,
        args.packets,
        args.dup_every,
        Duration::from_millis(args.interval_ms),
    ));

    let r = Arc::clone(&client);
    ctrlc::set_handler(move || {
        r.running.store(false, Ordering::SeqCst);
    })?;

    println!(
        "=== msgrelay-sender: {} packets over {} senders ===",
        args.packets, args.senders
    );
    let start = Instant::now();

    let mut senders = Vec::with_capacity(usize::from(args.senders));
    for i in 0..args.senders {
        let port = args.base_port.checked_add(i).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "sender port overflows u16")
        })?;
        senders.push(UdpSender::new(SocketAddr::new(args.host, port))?);
    }

    thread::scope(|scope| {
        for sender in &senders {
            let client = &client;
            scope.spawn(move || {
                if let Err(e) = client.run_sender(sender) {
                    log::warn!("sender {} stopped: {}", sender.target(), e);
                }
            });
        }
    });

    let elapsed = start.elapsed();
    println!("\n=== Results ===");
    println!("  Duration: {:?}", elapsed);
    println!("  Datagrams sent: {}", client.sent.load(Ordering::Relaxed));
    println!(
        "  Duplicates sent: {}",
        client.duplicates.load(Ordering::Relaxed)
    );
    Ok(())
}
