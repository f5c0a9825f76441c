//! Go-Back-N send-window bookkeeping.
//!
//! [`SendWindow`] tracks which chunk indices are currently outstanding.
//! Unlike stop-and-wait, up to `window_size` chunks may be in flight at once.
//!
//! # Protocol contract
//!
//! - The window covers `[left, right)` where `right = min(left + N, total)`.
//! - ACKs are **cumulative**: an ACK carrying `K` means every chunk with
//!   index `< K` has been delivered, so `left` jumps straight to `K` —
//!   a single ACK can retire several chunks.
//! - On timeout the caller retransmits **all** of `[left, right)` (go back N).
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.

use std::ops::Range;

/// Sliding-window state for one transfer.
///
/// ```text
///      left                right
///       │                    │
///  ─────┼────────────────────┼──────────────▶ chunk index
///       │ <── outstanding ──▶│ <── unsent ──▶
/// ```
#[derive(Debug)]
pub struct SendWindow {
    /// Lowest unacknowledged chunk index (left window edge).
    left: u32,

    /// One past the highest chunk index inside the window.
    right: u32,

    /// Maximum number of chunks in flight simultaneously (N).
    window_size: u32,

    /// Total number of chunks in the transfer.
    total: u32,
}

impl SendWindow {
    /// Create a window over `total` chunks.  `window_size` must be ≥ 1.
    pub fn new(window_size: u32, total: u32) -> Self {
        assert!(window_size >= 1, "window_size must be at least 1");
        Self {
            left: 0,
            right: window_size.min(total),
            window_size,
            total,
        }
    }

    /// Chunk indices currently in flight, oldest first.
    pub fn outstanding(&self) -> Range<u32> {
        self.left..self.right
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    /// `true` once every chunk has been acknowledged (`left == total`).
    ///
    /// Immediately `true` for an empty transfer.
    pub fn is_done(&self) -> bool {
        self.left >= self.total
    }

    /// Process a cumulative ACK.
    ///
    /// Returns the range of chunk indices newly exposed by the slide (the
    /// chunks the caller must now transmit), or `None` when the ACK does not
    /// advance the window (duplicate, stale, or beyond what was ever sent).
    pub fn on_ack(&mut self, ack: u32) -> Option<Range<u32>> {
        if ack <= self.left || ack > self.total {
            return None;
        }
        let old_right = self.right;
        self.left = ack;
        self.right = self.left.saturating_add(self.window_size).min(self.total);
        Some(old_right..self.right)
    }
}
