//! `uft` — reliable, in-order, exactly-once file delivery over lossy UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌────────────┐    DATA chunks     ┌──────────────┐
//!  │ FileSender │───────────────────▶│ FileReceiver │
//!  └─────┬──────┘                    └──────┬───────┘
//!        │        cumulative ACKs           │
//!        │◀──────────────────────────────────┘
//!        │
//!  ┌─────▼─────────────────────────────────┐
//!  │ window / session / estimator          │
//!  │ (pure protocol state, no I/O)         │
//!  └─────┬─────────────────────────────────┘
//!        │ raw UDP datagrams
//!  ┌─────▼─────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]    — wire format (serialise / deserialise / integrity)
//! - [`window`]    — Go-Back-N send-window bookkeeping
//! - [`session`]   — receiver session state machine + reordering buffer
//! - [`estimator`] — EWMA round-trip-time estimation
//! - [`handshake`] — START/END confirmation loop
//! - [`sender`]    — sender transfer loop (chunking, retransmission, RTT)
//! - [`receiver`]  — receiver loop (dispatch, fault injection, output sink)
//! - [`trace`]     — harness-facing packet/RTT event log
//! - [`socket`]    — async UDP socket abstraction

pub mod estimator;
pub mod handshake;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod socket;
pub mod trace;
pub mod window;
