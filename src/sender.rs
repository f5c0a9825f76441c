//! Sliding-window sender: chunking, window drive, retransmission, RTT.
//!
//! One transfer runs through [`FileSender::run`]:
//!
//! 1. START handshake with a random connection identifier.
//! 2. Data phase: transmit the window, drain cumulative ACKs, slide on
//!    progress, retransmit the whole outstanding window on timeout
//!    (Go-Back-N — there is no selective acknowledgment, so one loss costs
//!    the window).
//! 3. END handshake with the same identifier.
//!
//! The deadline for step 2 is a fixed constant, or `2 × estimated RTT` when
//! adaptive timing is enabled.  Everything runs on one task; the only
//! blocking point is "wait for the next datagram, up to the deadline".

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tokio::time::timeout;

use crate::estimator::RttEstimator;
use crate::handshake::{self, HandshakeError};
use crate::packet::{Packet, PacketType, MAX_PAYLOAD};
use crate::socket::{is_transient_io_error, Socket, SocketError};
use crate::trace::TraceLog;
use crate::window::SendWindow;

/// Retransmission deadline when adaptive timing is disabled.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Sender-side configuration, one value per CLI argument.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Receiver address and port.
    pub peer: SocketAddr,
    /// Go-Back-N window size (N ≥ 1).
    pub window_size: u32,
    /// File to transmit.
    pub input: PathBuf,
    /// Optional trace-log path.
    pub log: Option<PathBuf>,
    /// Derive the retransmission deadline from the RTT estimate.
    pub rtt_enabled: bool,
    /// Retransmit the outstanding window on timeout.
    pub loss_recovery: bool,
}

/// How a transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// START confirmed, payload delivered, END confirmed.
    Complete,
    /// START never confirmed; no data was sent.
    ConnectFailed,
    /// Payload delivered and acknowledged, but the END handshake exhausted
    /// its retries.
    CloseFailed,
}

/// Errors that abort a transfer outright (handshake exhaustion is an
/// [`TransferOutcome`], not an error).
#[derive(Debug, Error)]
pub enum SenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Socket(#[from] SocketError),
}

/// Owns the socket, trace log, and estimator for one transfer.
pub struct FileSender {
    config: SenderConfig,
    socket: Socket,
    trace: TraceLog,
    estimator: RttEstimator,
}

impl FileSender {
    /// Bind an ephemeral socket and open the trace log.
    pub async fn new(config: SenderConfig) -> Result<Self, SenderError> {
        let bind = SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, 0));
        let socket = Socket::bind(bind).await?;
        let trace = match &config.log {
            Some(path) => TraceLog::create(path)?,
            None => TraceLog::disabled(),
        };
        Ok(Self {
            config,
            socket,
            trace,
            estimator: RttEstimator::new(),
        })
    }

    /// Run the whole transfer: START handshake, data phase, END handshake.
    pub async fn run(mut self) -> Result<TransferOutcome, SenderError> {
        let conn_id = rand::thread_rng().gen_range(1..=u32::MAX);

        match handshake::confirm(
            &self.socket,
            self.config.peer,
            &Packet::start(conn_id),
            conn_id,
            &mut self.trace,
        )
        .await
        {
            Ok(()) => {}
            Err(HandshakeError::Exhausted) => return Ok(TransferOutcome::ConnectFailed),
            Err(HandshakeError::Socket(e)) => return Err(e.into()),
            Err(HandshakeError::Trace(e)) => return Err(e.into()),
        }

        let data = tokio::fs::read(&self.config.input).await?;
        let chunks: Vec<Packet> = data
            .chunks(MAX_PAYLOAD)
            .enumerate()
            .map(|(i, c)| Packet::data(i as u32, c.to_vec()))
            .collect();
        log::info!(
            "[sender] connected (id={conn_id}); {} bytes in {} chunk(s), window {}",
            data.len(),
            chunks.len(),
            self.config.window_size
        );

        self.drive_window(&chunks, conn_id).await?;

        match handshake::confirm(
            &self.socket,
            self.config.peer,
            &Packet::end(conn_id),
            conn_id,
            &mut self.trace,
        )
        .await
        {
            Ok(()) => Ok(TransferOutcome::Complete),
            Err(HandshakeError::Exhausted) => Ok(TransferOutcome::CloseFailed),
            Err(HandshakeError::Socket(e)) => Err(e.into()),
            Err(HandshakeError::Trace(e)) => Err(e.into()),
        }
    }

    /// Data phase: loop until every chunk is acknowledged.
    async fn drive_window(&mut self, chunks: &[Packet], conn_id: u32) -> Result<(), SenderError> {
        let mut window = SendWindow::new(self.config.window_size, chunks.len() as u32);
        if window.is_done() {
            return Ok(()); // empty file: nothing but handshakes
        }

        // Initial burst.
        for i in window.outstanding() {
            self.transmit_new(&chunks[i as usize]).await?;
        }
        let mut deadline = Instant::now() + self.timeout_value();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let polled = timeout(remaining, self.socket.recv_from()).await;

            let pkt = match polled {
                Err(_elapsed) => {
                    if self.config.loss_recovery {
                        let outstanding = window.outstanding();
                        log::debug!(
                            "[sender] timeout — retransmitting chunks {}..{}",
                            outstanding.start,
                            outstanding.end
                        );
                        for i in outstanding {
                            self.transmit(&chunks[i as usize]).await?;
                        }
                    }
                    deadline = Instant::now() + self.timeout_value();
                    continue;
                }
                Ok(Ok((pkt, _addr))) => pkt,
                // Malformed datagrams and transient ICMP-style errors read
                // as silence; the deadline handles actual loss.
                Ok(Err(SocketError::Packet(_))) => continue,
                Ok(Err(SocketError::Io(e))) if is_transient_io_error(&e) => continue,
                Ok(Err(e)) => return Err(e.into()),
            };

            if pkt.ptype != PacketType::Ack || !pkt.is_valid() {
                continue;
            }
            self.trace.packet(&pkt)?;

            // Late acknowledgment of the START packet, not data progress.
            if pkt.seq_num == conn_id {
                continue;
            }

            if self.config.rtt_enabled {
                if let Some(sample) = self.estimator.on_ack(pkt.seq_num, Instant::now()) {
                    log::debug!("[sender] {sample}");
                    self.trace.rtt(&sample)?;
                }
            }

            if let Some(exposed) = window.on_ack(pkt.seq_num) {
                log::debug!(
                    "[sender] ← ACK {} — window now {}..{}",
                    pkt.seq_num,
                    window.outstanding().start,
                    window.outstanding().end
                );
                if window.is_done() {
                    break;
                }
                for i in exposed {
                    self.transmit_new(&chunks[i as usize]).await?;
                }
                deadline = Instant::now() + self.timeout_value();
            }
        }

        log::info!("[sender] all {} chunk(s) acknowledged", chunks.len());
        Ok(())
    }

    /// First transmission of a chunk; eligible to become the RTT landmark.
    async fn transmit_new(&mut self, pkt: &Packet) -> Result<(), SenderError> {
        self.transmit(pkt).await?;
        if self.config.rtt_enabled {
            self.estimator.arm(pkt.seq_num, Instant::now());
        }
        Ok(())
    }

    /// Send one chunk and record it in the trace log.
    async fn transmit(&mut self, pkt: &Packet) -> Result<(), SenderError> {
        self.socket.send_to(pkt, self.config.peer).await?;
        self.trace.packet(pkt)?;
        Ok(())
    }

    fn timeout_value(&self) -> Duration {
        if self.config.rtt_enabled {
            self.estimator.timeout()
        } else {
            DEFAULT_TIMEOUT
        }
    }
}
