// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! msgrelay server
//!
//! Receives messages on `receivers` UDP ports, filters duplicates, and relays
//! the selected subset over one TCP connection. Exits after the idle timeout
//! or on Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! # Two receivers on 10100-10101, relay to 127.0.0.1:10200
//! msgrelay-server
//!
//! # Four receivers, relay messages whose data is 7
//! msgrelay-server --receivers 4 --relay-target 7
//!
//! # From a configuration file, with CLI overrides on top
//! msgrelay-server --config relay.toml --idle-timeout 30
//!
//! # Write the default configuration
//! msgrelay-server gen-config -o relay.toml
//! ```

use clap::{Parser, Subcommand};
use msgrelay::{NetTransport, Server, ServerConfig, ServerStats};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// UDP deduplicating relay server
#[derive(Parser, Debug)]
#[command(name = "msgrelay-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of UDP receivers (shards)
    #[arg(short, long)]
    receivers: Option<usize>,

    /// Relay messages whose data field equals this value
    #[arg(short = 't', long)]
    relay_target: Option<u64>,

    /// UDP bind address
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// First UDP port; receiver i listens on base + i
    #[arg(short = 'p', long)]
    udp_port: Option<u16>,

    /// Relay destination host
    #[arg(long)]
    relay_host: Option<IpAddr>,

    /// Relay destination TCP port
    #[arg(long)]
    relay_port: Option<u16>,

    /// Stop after this many seconds without a new message
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a configuration file with the defaults
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "relay.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging (also captures the library's `log` records)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = build_config(&args)?;

    info!("+----------------------------------------------------+");
    info!(
        "|         msgrelay server v{}                     |",
        env!("CARGO_PKG_VERSION")
    );
    info!("+----------------------------------------------------+");
    info!(
        "|  UDP:     {:40} |",
        format!(
            "{}:{}..{}",
            config.bind_address,
            config.udp_base_port,
            usize::from(config.udp_base_port) + config.receivers - 1
        )
    );
    info!("|  Relay:   {:40} |", config.relay_addr());
    info!("|  Target:  {:40} |", config.relay_target);
    info!(
        "|  Idle:    {:40} |",
        format!("{}s", config.idle_timeout_secs)
    );
    info!("+----------------------------------------------------+");

    let transport = NetTransport::new(&config);
    let server = Server::new(config)?;

    let handle = server.handle();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received, stopping server...");
        handle.stop();
    })?;

    let report = server.run(&transport)?;

    info!(
        "Server stopped after {:.1}s ({:?})",
        report.elapsed.as_secs_f64(),
        report.reason
    );
    print_stats(&report.stats);
    Ok(())
}

fn build_config(args: &Args) -> Result<ServerConfig, msgrelay::ConfigError> {
    let mut config = match args.config {
        Some(ref path) => {
            info!("Loading config from {:?}", path);
            ServerConfig::from_file(path)?
        }
        None => ServerConfig::default(),
    };

    if let Some(receivers) = args.receivers {
        config.receivers = receivers;
    }
    if let Some(target) = args.relay_target {
        config.relay_target = target;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(port) = args.udp_port {
        config.udp_base_port = port;
    }
    if let Some(host) = args.relay_host {
        config.relay_address = host;
    }
    if let Some(port) = args.relay_port {
        config.relay_port = port;
    }
    if let Some(secs) = args.idle_timeout {
        config.idle_timeout_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml = ServerConfig::default().to_toml()?;
    std::fs::write(&output, toml)?;
    println!("Generated configuration: {}", output.display());
    Ok(())
}

fn cmd_validate(config: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_file(&config)?;
    println!("Configuration valid");
    println!("  Receivers: {}", config.receivers);
    println!("  UDP base:  {}:{}", config.bind_address, config.udp_base_port);
    println!("  Relay:     {}", config.relay_addr());
    println!("  Target:    {}", config.relay_target);
    Ok(())
}

fn print_stats(stats: &ServerStats) {
    info!("  Accepted:   {}", stats.accepted);
    info!("  Duplicates: {}", stats.duplicates);
    info!("  Malformed:  {}", stats.malformed);
    info!("  Relayed:    {}", stats.relayed);
    info!(
        "  Rotations:  {} ({} entries discarded)",
        stats.rotations, stats.discarded
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let args = Args::parse_from([
            "msgrelay-server",
            "--receivers",
            "4",
            "--relay-target",
            "7",
            "--relay-port",
            "12000",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.receivers, 4);
        assert_eq!(config.relay_target, 7);
        assert_eq!(config.relay_port, 12000);
        assert_eq!(config.udp_base_port, 10100);
    }

    #[test]
    fn test_cli_rejects_invalid_override() {
        let args = Args::parse_from(["msgrelay-server", "--receivers", "0"]);
        assert!(build_config(&args).is_err());
    }
}
