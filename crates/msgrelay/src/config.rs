// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server configuration.
//!
//! Supports both programmatic and TOML file configuration. Every field has a
//! default, so a file only needs the keys it overrides:
//!
//! ```toml
//! receivers = 4
//! relay_target = 10
//! udp_base_port = 10100
//! relay_address = "10.0.0.7"
//! relay_port = 10200
//! idle_timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Relay server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Ingestion workers, one shard and one UDP port each.
    #[serde(default = "default_receivers")]
    pub receivers: usize,

    /// Accepted messages whose `data` equals this value are relayed.
    #[serde(default = "default_relay_target")]
    pub relay_target: u64,

    /// Ids remembered by the duplicate filter.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Slots per physical page (power of two).
    #[serde(default = "default_page_capacity")]
    pub page_capacity: usize,

    /// Address the UDP receivers bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Shard `i` listens on `udp_base_port + i`.
    #[serde(default = "default_udp_base_port")]
    pub udp_base_port: u16,

    /// Downstream consumer host.
    #[serde(default = "default_relay_address")]
    pub relay_address: IpAddr,

    /// Downstream consumer TCP port.
    #[serde(default = "default_relay_port")]
    pub relay_port: u16,

    /// Receive timeout so ingestion workers can observe shutdown.
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    /// Outbound relay connect timeout.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Stop once no new message was accepted for this long.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Watchdog poll period.
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,

    /// Forwarder park slice while the relay queue is empty.
    #[serde(default = "default_forward_wait_ms")]
    pub forward_wait_ms: u64,
}

fn default_receivers() -> usize {
    2
}

fn default_relay_target() -> u64 {
    10
}

fn default_window_capacity() -> usize {
    16
}

fn default_page_capacity() -> usize {
    1024
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_udp_base_port() -> u16 {
    10100
}

fn default_relay_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_relay_port() -> u16 {
    10200
}

fn default_receive_timeout_ms() -> u64 {
    500
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_idle_timeout_secs() -> u64 {
    10
}

fn default_watchdog_interval_ms() -> u64 {
    5000
}

fn default_forward_wait_ms() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            receivers: default_receivers(),
            relay_target: default_relay_target(),
            window_capacity: default_window_capacity(),
            page_capacity: default_page_capacity(),
            bind_address: default_bind_address(),
            udp_base_port: default_udp_base_port(),
            relay_address: default_relay_address(),
            relay_port: default_relay_port(),
            receive_timeout_ms: default_receive_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
            forward_wait_ms: default_forward_wait_ms(),
        }
    }
}

impl ServerConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.receivers == 0 {
            return Err(ConfigError::Invalid("receivers cannot be 0".into()));
        }
        if self.window_capacity == 0 {
            return Err(ConfigError::Invalid("window_capacity cannot be 0".into()));
        }
        if self.page_capacity == 0 || !self.page_capacity.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "page_capacity must be a non-zero power of two, got {}",
                self.page_capacity
            )));
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid("idle_timeout_secs cannot be 0".into()));
        }
        if self.watchdog_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "watchdog_interval_ms cannot be 0".into(),
            ));
        }
        let last_port = usize::from(self.udp_base_port).checked_add(self.receivers - 1);
        if !matches!(last_port, Some(port) if port <= usize::from(u16::MAX)) {
            return Err(ConfigError::Invalid(format!(
                "{} receivers from udp port {} overflow the port range",
                self.receivers, self.udp_base_port
            )));
        }
        Ok(())
    }

    /// UDP address of `shard`'s receiver.
    pub fn receiver_addr(&self, shard: usize) -> Option<SocketAddr> {
        let port = u16::try_from(usize::from(self.udp_base_port) + shard).ok()?;
        Some(SocketAddr::new(self.bind_address, port))
    }

    pub fn relay_addr(&self) -> SocketAddr {
        SocketAddr::new(self.relay_address, self.relay_port)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn forward_wait(&self) -> Duration {
        Duration::from_millis(self.forward_wait_ms)
    }
}
