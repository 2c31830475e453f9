// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP relay connection.
//!
//! The forwarder dials out through [`TcpRelaySink`]. The downstream consumer
//! side is [`RelayListener`], whose `accept` is bounded by a timeout using a
//! mio poll on the non-blocking listener.
//!
//! Frames are back-to-back 19-byte messages with no extra framing.

use super::RelaySink;
use crate::message::{Message, MESSAGE_WIRE_SIZE};
use mio::{Events, Interest, Poll, Token};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

const LISTENER_TOKEN: Token = Token(0);

/// Outbound relay connection.
#[derive(Debug)]
pub struct TcpRelaySink {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpRelaySink {
    pub fn connect(addr: SocketAddr, timeout: Duration) -> io::Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        log::debug!("[TCP] relay connected peer={}", addr);
        Ok(Self { stream, peer: addr })
    }

    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl RelaySink for TcpRelaySink {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write_all(buf)?;
        Ok(buf.len())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

/// Accepting side of the relay connection.
pub struct RelayListener {
    listener: mio::net::TcpListener,
    poll: Poll,
    events: Events,
    local_addr: SocketAddr,
}

impl RelayListener {
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let mut listener = mio::net::TcpListener::bind(addr)?;
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        let local_addr = listener.local_addr()?;
        log::debug!("[TCP] relay listener bound addr={}", local_addr);
        Ok(Self {
            listener,
            poll,
            events: Events::with_capacity(8),
            local_addr,
        })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait up to `timeout` for a connection; `Ok(None)` on timeout.
    pub fn accept(&mut self, timeout: Duration) -> io::Result<Option<RelayConnection>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    log::debug!("[TCP] relay accepted peer={}", peer);
                    return RelayConnection::from_mio(stream, peer).map(Some);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.poll.poll(&mut self.events, Some(remaining)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

/// Accepted relay stream, read one message frame at a time.
#[derive(Debug)]
pub struct RelayConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl RelayConnection {
    fn from_mio(stream: mio::net::TcpStream, peer: SocketAddr) -> io::Result<Self> {
        let stream = into_std(stream);
        stream.set_nonblocking(false)?;
        Ok(Self { stream, peer })
    }

    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Bound each read; a timed-out read surfaces as an error.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Read the next frame; `Ok(None)` once the peer closes the stream.
    pub fn read_message(&mut self) -> io::Result<Option<Message>> {
        let mut frame = [0u8; MESSAGE_WIRE_SIZE];
        match self.stream.read_exact(&mut frame) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }
        Message::decode(&frame)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(unix)]
fn into_std(stream: mio::net::TcpStream) -> TcpStream {
    use std::os::fd::{FromRawFd, IntoRawFd};
    // SAFETY: the descriptor comes straight from `into_raw_fd`, so ownership
    // moves to the std stream and nothing else closes it.
    unsafe { TcpStream::from_raw_fd(stream.into_raw_fd()) }
}

#[cfg(windows)]
fn into_std(stream: mio::net::TcpStream) -> TcpStream {
    use std::os::windows::io::{FromRawSocket, IntoRawSocket};
    // SAFETY: see the unix variant.
    unsafe { TcpStream::from_raw_socket(stream.into_raw_socket()) }
}
