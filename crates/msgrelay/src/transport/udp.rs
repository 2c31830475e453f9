// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP ingestion receivers and the network transport backend.
//!
//! Shard `i` binds `bind_address:udp_base_port + i` with SO_REUSEADDR and a
//! read timeout, so an idle worker wakes up regularly to observe shutdown.

use super::tcp::TcpRelaySink;
use super::{timeout_as_empty, DatagramSource, RelaySink, Transport};
use crate::config::ServerConfig;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

/// Smallest read timeout handed to the OS; zero would mean "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Network backend: UDP receivers plus a TCP relay connection.
#[derive(Debug, Clone)]
pub struct NetTransport {
    config: ServerConfig,
}

impl NetTransport {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Bind the UDP receiver for `shard`.
    pub fn bind_receiver(&self, shard: usize) -> io::Result<UdpSource> {
        let addr = self.config.receiver_addr(shard).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no UDP port for shard {}", shard),
            )
        })?;
        UdpSource::bind(addr, self.config.receive_timeout())
    }
}

impl Transport for NetTransport {
    fn open_receiver(&self, shard: usize) -> io::Result<Box<dyn DatagramSource>> {
        Ok(Box::new(self.bind_receiver(shard)?))
    }

    fn open_relay(&self) -> io::Result<Box<dyn RelaySink>> {
        let sink = TcpRelaySink::connect(self.config.relay_addr(), self.config.connect_timeout())?;
        Ok(Box::new(sink))
    }
}

/// Bound UDP socket feeding one ingestion worker.
#[derive(Debug)]
pub struct UdpSource {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpSource {
    pub fn bind(addr: SocketAddr, read_timeout: Duration) -> io::Result<Self> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.set_read_timeout(Some(read_timeout.max(MIN_READ_TIMEOUT)))?;

        let socket: UdpSocket = socket.into();
        let local_addr = socket.local_addr()?;
        log::debug!("[UDP] receiver bound addr={}", local_addr);
        Ok(Self { socket, local_addr })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl DatagramSource for UdpSource {
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        timeout_as_empty(self.socket.recv(buf))
    }
}

/// Unconnected UDP sender aimed at one ingestion port.
#[derive(Debug)]
pub struct UdpSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSender {
    /// Bind an ephemeral local port of the same family as `target`.
    pub fn new(target: SocketAddr) -> io::Result<Self> {
        let local = match target.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(local)?;
        Ok(Self { socket, target })
    }

    pub fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_to(buf, self.target)
    }

    #[inline]
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, MESSAGE_WIRE_SIZE};
    use std::time::Instant;

    fn loopback_config() -> ServerConfig {
        ServerConfig {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            udp_base_port: 0,
            receive_timeout_ms: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_receive_times_out_with_zero() {
        let transport = NetTransport::new(&loopback_config());
        let mut source = transport.bind_receiver(0).unwrap();
        let mut buf = [0u8; 64];

        let start = Instant::now();
        assert_eq!(source.receive(&mut buf).unwrap(), 0);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_sender_to_receiver() {
        let transport = NetTransport::new(&loopback_config());
        let mut source = transport.bind_receiver(0).unwrap();
        let sender = UdpSender::new(source.local_addr()).unwrap();

        let msg = Message::new(19, 3, 42, 10);
        assert_eq!(sender.send(&msg.encode()).unwrap(), MESSAGE_WIRE_SIZE);

        let mut buf = [0u8; 64];
        let mut n = 0;
        for _ in 0..20 {
            n = source.receive(&mut buf).unwrap();
            if n > 0 {
                break;
            }
        }
        assert_eq!(n, MESSAGE_WIRE_SIZE);
        assert_eq!(Message::decode(&buf[..n]).unwrap(), msg);
    }

    #[test]
    fn test_shard_port_overflow_rejected() {
        let config = ServerConfig {
            udp_base_port: u16::MAX,
            ..loopback_config()
        };
        let transport = NetTransport::new(&config);
        let err = transport.bind_receiver(1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
