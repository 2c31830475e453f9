// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! msgrelay-listener - downstream relay consumer
//!
//! Accepts the server's relay connection and prints every message it
//! forwards. Goes back to accepting when the server disconnects and exits
//! once no connection arrives within `--accept-timeout`.

use clap::Parser;
use msgrelay::RelayListener;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// msgrelay downstream listener
#[derive(Parser, Debug)]
#[command(name = "msgrelay-listener")]
#[command(version = "0.1.0")]
#[command(about = "Print messages relayed by a msgrelay server")]
struct Args {
    /// Bind address
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Relay TCP port
    #[arg(short, long, default_value = "10200")]
    port: u16,

    /// Exit when no connection arrives within this many seconds
    #[arg(short, long, default_value = "60")]
    accept_timeout: u64,
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
    let mut listener = RelayListener::bind(SocketAddr::new(args.bind, args.port))?;
    let timeout = Duration::from_secs(args.accept_timeout);
    println!("Listening on {}", listener.local_addr());

    let mut total = 0u64;
    while let Some(mut conn) = listener.accept(timeout)? {
        println!("Connection from {}", conn.peer_addr());
        let mut received = 0u64;
        loop {
            match conn.read_message() {
                Ok(Some(msg)) => {
                    received += 1;
                    println!("Received: {}", msg);
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("read from {} failed: {}", conn.peer_addr(), e);
                    break;
                }
            }
        }
        println!("Disconnected {} after {} messages", conn.peer_addr(), received);
        total += received;
    }

    println!("No connection within {:?}, exiting ({} messages total)", timeout, total);
    Ok(())
}
