//! Reordering receiver: dispatch, fault injection, and the output sink.
//!
//! [`FileReceiver::run`] serves exactly one transfer and returns.  Each
//! datagram goes through the same pipeline: decode (malformed input is
//! silently dropped), trace-log, then dispatch on type against the session
//! state in [`crate::session`].  DATA additionally passes the checksum test,
//! the optional every-Nth drop (fault injection for loss testing), and the
//! acceptance-window test before it is buffered; contiguous chunks drain to
//! the output file with a flush per write, and the cumulative ACK always
//! carries the post-drain `expected_seq`.
//!
//! Outbound ACKs may be delayed by a fixed base plus symmetric jitter to
//! emulate a degraded return path; this is a test knob, not a correctness
//! requirement.

use std::fs::{self, File};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::packet::{Packet, PacketType};
use crate::session::{DataOutcome, Session, StartOutcome};
use crate::socket::{Socket, SocketError};
use crate::trace::TraceLog;

/// Receiver-side configuration, one value per CLI argument.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// UDP port to listen on (0 = OS-assigned, used by tests).
    pub port: u16,
    /// Acceptance-window size (N ≥ 1).
    pub window_size: u32,
    /// Where delivered bytes are written.
    pub output: PathBuf,
    /// Optional trace-log path.
    pub log: Option<PathBuf>,
    /// Drop every Nth valid DATA packet (fault injection).
    pub drop_every: Option<u32>,
    /// Fixed delay before each outbound ACK.
    pub base_delay: Duration,
    /// Symmetric jitter added to the delay.
    pub jitter: Duration,
}

/// Errors that abort the receiver.
#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Socket(#[from] SocketError),
}

/// Owns the socket, trace log, session state, and output sink.
pub struct FileReceiver {
    config: ReceiverConfig,
    socket: Socket,
    trace: TraceLog,
    session: Session,
    output: Option<File>,
    /// Valid in-session DATA arrivals, for the every-Nth drop counter.
    data_seen: u64,
}

impl FileReceiver {
    /// Bind the listening socket and open the trace log.
    pub async fn new(config: ReceiverConfig) -> Result<Self, ReceiverError> {
        if let Some(dir) = config.output.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let bind = SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, config.port));
        let socket = Socket::bind(bind).await?;
        let trace = match &config.log {
            Some(path) => TraceLog::create(path)?,
            None => TraceLog::disabled(),
        };
        let session = Session::new(config.window_size);
        Ok(Self {
            config,
            socket,
            trace,
            session,
            output: None,
            data_seen: 0,
        })
    }

    /// Resolved listening address (tests bind port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Serve one transfer: runs until the END handshake completes.
    pub async fn run(mut self) -> Result<(), ReceiverError> {
        log::info!("[receiver] listening on {}", self.socket.local_addr);

        loop {
            let (pkt, addr) = match self.socket.recv_from().await {
                Ok(v) => v,
                // Malformed datagram: silently dropped, no response.
                Err(SocketError::Packet(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            self.trace.packet(&pkt)?;

            match pkt.ptype {
                PacketType::Start => match self.session.on_start(pkt.seq_num) {
                    StartOutcome::Opened => {
                        self.output = Some(File::create(&self.config.output)?);
                        self.data_seen = 0;
                        log::info!("[receiver] session open (id={})", pkt.seq_num);
                        self.send_ack(pkt.seq_num, addr).await?;
                    }
                    StartOutcome::Reacked => self.send_ack(pkt.seq_num, addr).await?,
                    StartOutcome::Rejected => {}
                },

                PacketType::Data if self.session.is_open() => {
                    if !pkt.is_valid() {
                        log::debug!("[receiver] ← DATA seq={} bad checksum", pkt.seq_num);
                        continue;
                    }
                    if self.should_drop() {
                        log::debug!("[receiver] ← DATA seq={} dropped (fault)", pkt.seq_num);
                        continue;
                    }
                    match self.session.on_data(pkt.seq_num, &pkt.payload) {
                        DataOutcome::OutOfWindow => {}
                        DataOutcome::Ack { ready } => {
                            if let Some(out) = self.output.as_mut() {
                                for chunk in &ready {
                                    // Flush per write so no delivered byte
                                    // is lost on an abrupt stop.
                                    out.write_all(chunk)?;
                                    out.flush()?;
                                }
                            }
                            self.send_ack(self.session.expected_seq(), addr).await?;
                        }
                    }
                }

                PacketType::End if self.session.is_open() => {
                    if self.session.on_end(pkt.seq_num) {
                        self.send_ack(pkt.seq_num, addr).await?;
                        if let Some(mut out) = self.output.take() {
                            out.flush()?;
                        }
                        log::info!("[receiver] session closed (id={})", pkt.seq_num);
                        return Ok(());
                    }
                }

                // DATA/END with no session, and stray ACKs: no response.
                _ => {}
            }
        }
    }

    /// Every-Nth drop counter over valid in-session DATA arrivals; counted
    /// globally per session, independent of sequence numbers, so
    /// retransmissions count again.
    fn should_drop(&mut self) -> bool {
        let Some(n) = self.config.drop_every else {
            return false;
        };
        self.data_seen += 1;
        self.data_seen % u64::from(n) == 0
    }

    /// Send (and trace-log) one cumulative ACK, applying the simulated
    /// return-path delay first.
    async fn send_ack(&mut self, seq_num: u32, dest: SocketAddr) -> Result<(), ReceiverError> {
        if let Some(delay) = self.ack_delay() {
            tokio::time::sleep(delay).await;
        }
        let ack = Packet::ack(seq_num);
        self.socket.send_to(&ack, dest).await?;
        self.trace.packet(&ack)?;
        Ok(())
    }

    fn ack_delay(&self) -> Option<Duration> {
        if self.config.base_delay.is_zero() {
            return None;
        }
        let mut millis = self.config.base_delay.as_millis() as i64;
        let jitter = self.config.jitter.as_millis() as i64;
        if jitter > 0 {
            millis += rand::thread_rng().gen_range(-jitter..=jitter);
        }
        Some(Duration::from_millis(millis.max(0) as u64))
    }
}
