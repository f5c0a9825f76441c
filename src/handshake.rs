//! Connection establishment and teardown (sender side).
//!
//! The handshake is symmetric between START and END: send the control packet,
//! wait briefly for an ACK echoing its sequence number, resend on silence.
//! The sender moves through `IDLE → AWAITING_ACK → CONFIRMED`, or `FAILED`
//! once the retry budget is exhausted.  Everything that is not the expected
//! ACK is ignored while waiting — stray traffic never fails a handshake,
//! only the clock does.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::timeout;

use crate::packet::{Packet, PacketType};
use crate::socket::{is_transient_io_error, Socket, SocketError};
use crate::trace::TraceLog;

/// Retry budget for one handshake.
pub const MAX_ATTEMPTS: u32 = 10;

/// How long each attempt waits for the matching ACK before resending.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_millis(100);

/// Errors from a handshake attempt.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// No matching ACK after [`MAX_ATTEMPTS`] sends.  Fatal for START,
    /// a warning for END (the payload was already acknowledged).
    #[error("no matching acknowledgment after {MAX_ATTEMPTS} attempts")]
    Exhausted,
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error("trace log write failed: {0}")]
    Trace(#[from] std::io::Error),
}

/// Repeatedly send `packet` to `peer` until an ACK arrives whose sequence
/// number equals `expected_ack`.
///
/// Each transmission is recorded in the trace log; of the inbound traffic,
/// only the matching ACK is recorded (everything else is ignored and the
/// wait continues until the attempt's deadline).
pub async fn confirm(
    socket: &Socket,
    peer: SocketAddr,
    packet: &Packet,
    expected_ack: u32,
    trace: &mut TraceLog,
) -> Result<(), HandshakeError> {
    for attempt in 1..=MAX_ATTEMPTS {
        socket.send_to(packet, peer).await?;
        trace.packet(packet)?;
        log::debug!(
            "[handshake] → {:?} seq={} (attempt {attempt}/{MAX_ATTEMPTS})",
            packet.ptype,
            packet.seq_num
        );

        let deadline = Instant::now() + ATTEMPT_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break; // attempt expired; resend
            }
            match timeout(remaining, socket.recv_from()).await {
                Ok(Ok((pkt, _))) => {
                    if pkt.ptype == PacketType::Ack
                        && pkt.seq_num == expected_ack
                        && pkt.is_valid()
                    {
                        trace.packet(&pkt)?;
                        log::debug!("[handshake] ← ACK seq={} — confirmed", pkt.seq_num);
                        return Ok(());
                    }
                    // Anything else (stale data ACKs, duplicates, noise) is
                    // not an error; keep waiting out this attempt.
                }
                Ok(Err(SocketError::Packet(_))) => {}
                Ok(Err(SocketError::Io(e))) if is_transient_io_error(&e) => {}
                Ok(Err(e)) => return Err(e.into()),
                Err(_elapsed) => break,
            }
        }
    }

    log::warn!(
        "[handshake] {:?} seq={} unconfirmed after {MAX_ATTEMPTS} attempts",
        packet.ptype,
        packet.seq_num
    );
    Err(HandshakeError::Exhausted)
}
