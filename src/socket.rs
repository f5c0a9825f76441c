//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`crate::packet::Packet`] instead of raw bytes.  All protocol logic lives
//! elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::{Packet, PacketError, MAX_DATAGRAM};

/// Errors that can arise from socket operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),
    /// The received datagram could not be decoded as a packet.
    #[error("packet decode error: {0}")]
    Packet(#[from] PacketError),
}

/// Returns `true` if the error is likely transient (waiting may still
/// succeed).  Unconnected UDP sockets can surface ICMP unreachable notices
/// as `ConnectionRefused`/`ConnectionReset`; the protocol treats those like
/// silence and recovers via its own timeouts.
pub fn is_transient_io_error(e: &io::Error) -> bool {
    use io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::TimedOut
            | ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
    )
}

/// An async, packet-oriented UDP socket.
///
/// All methods are `&self`; each role owns exactly one socket and drives it
/// from a single loop.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (resolved after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing port 0 lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Encode `packet` and send it as a single UDP datagram to `dest`.
    pub async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(&packet.encode(), dest).await?;
        Ok(())
    }

    /// Receive the next datagram and decode it into a [`Packet`].
    ///
    /// Returns `(packet, sender_address)`.  Datagrams that fail to decode are
    /// returned as [`SocketError::Packet`] — the caller decides whether the
    /// drop is silent.  Bytes beyond [`MAX_DATAGRAM`] are truncated.
    pub async fn recv_from(&self) -> Result<(Packet, SocketAddr), SocketError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        let packet = Packet::decode(&buf[..n])?;
        Ok((packet, addr))
    }
}
