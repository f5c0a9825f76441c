//! Entry point for `uft`.
//!
//! Parses CLI arguments and dispatches into either **send** or **recv** mode.
//! All actual protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing) and the exit messages.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use uft::receiver::{FileReceiver, ReceiverConfig};
use uft::sender::{FileSender, SenderConfig, TransferOutcome};

/// Reliable file transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Transmit a file to a listening receiver.
    Send {
        /// Receiver IP address.
        receiver_addr: IpAddr,
        /// Receiver UDP port.
        receiver_port: u16,
        /// Sliding-window size (chunks in flight).
        window_size: u32,
        /// File to transmit.
        input_file: PathBuf,
        /// Write a packet/RTT trace log to FILE.
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
        /// Derive the retransmission timeout from the RTT estimate.
        #[arg(long)]
        rtt: bool,
        /// Retransmit the outstanding window on timeout.
        #[arg(long)]
        loss_recovery: bool,
    },
    /// Receive one file and exit.
    Recv {
        /// UDP port to listen on.
        port: u16,
        /// Acceptance-window size (out-of-order chunks buffered).
        window_size: u32,
        /// Where delivered bytes are written.
        output_file: PathBuf,
        /// Write a packet trace log to FILE.
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
        /// Drop every Nth DATA packet (fault injection).
        #[arg(long, value_name = "N")]
        drop: Option<u32>,
        /// Delay each ACK by MS milliseconds.
        #[arg(long, value_name = "MS", default_value_t = 0)]
        delay: u64,
        /// Add ±MS milliseconds of jitter to the ACK delay.
        #[arg(long, value_name = "MS", default_value_t = 0)]
        jitter: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set RUST_LOG to control diagnostic verbosity.
    env_logger::init();

    match Cli::parse().mode {
        Mode::Send {
            receiver_addr,
            receiver_port,
            window_size,
            input_file,
            log,
            rtt,
            loss_recovery,
        } => {
            let config = SenderConfig {
                peer: (receiver_addr, receiver_port).into(),
                window_size,
                input: input_file,
                log,
                rtt_enabled: rtt,
                loss_recovery,
            };
            let sender = FileSender::new(config).await.context("sender setup")?;
            match sender.run().await.context("transfer failed")? {
                TransferOutcome::Complete => {}
                TransferOutcome::ConnectFailed => {
                    println!("Failed to establish connection");
                }
                TransferOutcome::CloseFailed => {
                    println!("Warning: Failed to properly close connection");
                }
            }
        }
        Mode::Recv {
            port,
            window_size,
            output_file,
            log,
            drop,
            delay,
            jitter,
        } => {
            let config = ReceiverConfig {
                port,
                window_size,
                output: output_file,
                log,
                drop_every: drop.filter(|&n| n > 0),
                base_delay: Duration::from_millis(delay),
                jitter: Duration::from_millis(jitter),
            };
            let receiver = FileReceiver::new(config).await.context("receiver setup")?;
            receiver.run().await.context("receive failed")?;
        }
    }

    Ok(())
}
