//! Receiver-side session state machine and reordering buffer.
//!
//! [`Session`] implements the receive side of the protocol:
//!
//! - `CLOSED → OPEN` on the first START; the START's own sequence number
//!   becomes the connection identifier and is what the sender waits for.
//! - While open, repeated STARTs with the same identifier are re-acknowledged
//!   with no side effects; STARTs with a different identifier are rejected.
//! - DATA inside the acceptance window `[expected_seq, expected_seq + N)` is
//!   buffered; contiguous chunks drain out in order; every drain is followed
//!   by a **cumulative ACK** carrying the post-drain `expected_seq`.
//! - `OPEN → CLOSED` on an END whose sequence number matches the identifier.
//!
//! This module only manages state; socket and file I/O are the caller's
//! responsibility (same pattern as [`crate::window`] on the send side).

use std::collections::BTreeMap;

/// How the session reacted to a START packet.
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// First START: fresh session opened; caller must open the output sink
    /// and acknowledge with the START's sequence number.
    Opened,
    /// Retry of the current session's START; caller re-acknowledges only.
    Reacked,
    /// START with a different identifier against an open session; no response.
    Rejected,
}

/// How the session reacted to a DATA packet.
#[derive(Debug, PartialEq, Eq)]
pub enum DataOutcome {
    /// Too far ahead of `expected_seq`; dropped without acknowledgment to
    /// bound buffer growth.
    OutOfWindow,
    /// Buffered (or a stale duplicate).  `ready` holds the payloads that
    /// became contiguous, in chunk order; the caller writes them out and then
    /// acknowledges [`Session::expected_seq`].
    Ack { ready: Vec<Vec<u8>> },
}

/// Receive-side state for one transfer.
#[derive(Debug)]
pub struct Session {
    /// Connection identifier of the open session (`None` = closed).
    conn_id: Option<u32>,

    /// Next chunk index still wanted (`expected_seq`).
    expected_seq: u32,

    /// Chunks received ahead of `expected_seq`, keyed by index.
    ///
    /// Holds at most `window_size` entries by construction: anything at or
    /// beyond `expected_seq + window_size` is rejected before insertion.
    buffer: BTreeMap<u32, Vec<u8>>,

    /// Acceptance-window size (N).
    window_size: u32,
}

impl Session {
    /// Create a closed session.  `window_size` must be ≥ 1.
    pub fn new(window_size: u32) -> Self {
        assert!(window_size >= 1, "window_size must be at least 1");
        Self {
            conn_id: None,
            expected_seq: 0,
            buffer: BTreeMap::new(),
            window_size,
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn_id.is_some()
    }

    /// Cumulative acknowledgment value: the next chunk index still wanted.
    pub fn expected_seq(&self) -> u32 {
        self.expected_seq
    }

    /// Number of out-of-order chunks currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Process a START packet.
    pub fn on_start(&mut self, conn_id: u32) -> StartOutcome {
        match self.conn_id {
            None => {
                self.conn_id = Some(conn_id);
                self.expected_seq = 0;
                self.buffer.clear();
                StartOutcome::Opened
            }
            Some(id) if id == conn_id => StartOutcome::Reacked,
            Some(_) => StartOutcome::Rejected,
        }
    }

    /// Process an END packet.  Returns `true` (and closes the session) only
    /// when the sequence number matches the open session's identifier.
    pub fn on_end(&mut self, conn_id: u32) -> bool {
        if self.conn_id == Some(conn_id) {
            self.conn_id = None;
            true
        } else {
            false
        }
    }

    /// Process a DATA packet that already passed the checksum test.
    ///
    /// A stale duplicate (`seq < expected_seq`) is not buffered but still
    /// yields [`DataOutcome::Ack`] with nothing ready, so the sender's window
    /// re-synchronizes on the cumulative ACK.
    pub fn on_data(&mut self, seq: u32, payload: &[u8]) -> DataOutcome {
        if seq >= self.expected_seq.saturating_add(self.window_size) {
            return DataOutcome::OutOfWindow;
        }
        if seq >= self.expected_seq {
            // Re-storing at an already-buffered index is a harmless overwrite.
            self.buffer.insert(seq, payload.to_vec());
        }

        let mut ready = Vec::new();
        while let Some(chunk) = self.buffer.remove(&self.expected_seq) {
            ready.push(chunk);
            self.expected_seq += 1;
        }
        DataOutcome::Ack { ready }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(window_size: u32) -> Session {
        let mut s = Session::new(window_size);
        assert_eq!(s.on_start(777), StartOutcome::Opened);
        s
    }

    #[test]
    fn first_start_opens_session() {
        let mut s = Session::new(5);
        assert!(!s.is_open());
        assert_eq!(s.on_start(42), StartOutcome::Opened);
        assert!(s.is_open());
        assert_eq!(s.expected_seq(), 0);
    }

    #[test]
    fn repeated_start_same_id_is_idempotent() {
        let mut s = open(5);
        s.on_data(0, b"abc");
        assert_eq!(s.on_start(777), StartOutcome::Reacked);
        // No side effects: progress survives the retry.
        assert_eq!(s.expected_seq(), 1);
    }

    #[test]
    fn start_with_other_id_rejected_while_open() {
        let mut s = open(5);
        assert_eq!(s.on_start(888), StartOutcome::Rejected);
        assert!(s.is_open());
    }

    #[test]
    fn in_order_data_drains_immediately() {
        let mut s = open(5);
        match s.on_data(0, b"hello") {
            DataOutcome::Ack { ready } => assert_eq!(ready, vec![b"hello".to_vec()]),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(s.expected_seq(), 1);
        assert_eq!(s.buffered(), 0);
    }

    #[test]
    fn out_of_order_data_buffered_until_gap_fills() {
        let mut s = open(5);
        match s.on_data(1, b"b") {
            DataOutcome::Ack { ready } => assert!(ready.is_empty()),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(s.expected_seq(), 0);
        assert_eq!(s.buffered(), 1);

        // The gap fills and both chunks drain in order.
        match s.on_data(0, b"a") {
            DataOutcome::Ack { ready } => {
                assert_eq!(ready, vec![b"a".to_vec(), b"b".to_vec()]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(s.expected_seq(), 2);
        assert_eq!(s.buffered(), 0);
    }

    #[test]
    fn data_beyond_acceptance_window_discarded() {
        let mut s = open(3);
        assert_eq!(s.on_data(3, b"x"), DataOutcome::OutOfWindow);
        assert_eq!(s.buffered(), 0);
        // The edge just inside the window is accepted.
        match s.on_data(2, b"y") {
            DataOutcome::Ack { ready } => assert!(ready.is_empty()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn stale_duplicate_still_acked_not_buffered() {
        let mut s = open(5);
        s.on_data(0, b"a");
        assert_eq!(s.expected_seq(), 1);

        match s.on_data(0, b"a") {
            DataOutcome::Ack { ready } => assert!(ready.is_empty()),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(s.expected_seq(), 1, "stale data must not move expected_seq");
        assert_eq!(s.buffered(), 0);
    }

    #[test]
    fn duplicate_buffered_chunk_overwrites_harmlessly() {
        let mut s = open(5);
        s.on_data(2, b"c");
        s.on_data(2, b"c");
        assert_eq!(s.buffered(), 1);
    }

    #[test]
    fn expected_seq_is_monotonic() {
        let mut s = open(4);
        let mut last = 0;
        for seq in [2u32, 0, 3, 1, 0, 5, 4] {
            let _ = s.on_data(seq, b"z");
            assert!(s.expected_seq() >= last);
            last = s.expected_seq();
        }
    }

    #[test]
    fn buffer_never_exceeds_window_size() {
        let mut s = open(4);
        // Hold back chunk 0 so nothing drains, then offer a spread of indices.
        for seq in 1..20u32 {
            let _ = s.on_data(seq, b"z");
            assert!(s.buffered() <= 4);
        }
        assert_eq!(s.buffered(), 3); // chunks 1, 2, 3
    }

    #[test]
    fn end_with_matching_id_closes() {
        let mut s = open(5);
        assert!(!s.on_end(123));
        assert!(s.is_open());
        assert!(s.on_end(777));
        assert!(!s.is_open());
    }

    #[test]
    fn reopen_after_close_resets_progress() {
        let mut s = open(5);
        s.on_data(0, b"a");
        s.on_end(777);
        assert_eq!(s.on_start(999), StartOutcome::Opened);
        assert_eq!(s.expected_seq(), 0);
        assert_eq!(s.buffered(), 0);
    }
}
