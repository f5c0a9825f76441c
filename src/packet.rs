//! Wire-format definitions for protocol packets.
//!
//! Every datagram exchanged between sender and receiver is a [`Packet`].
//! This module is responsible for:
//! - Defining the on-wire binary layout (header fields, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`].
//! - Checking packet integrity ([`Packet::is_valid`]).
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All fields are **big-endian** `u32`.
//!
//! ```text
//!  0               1               2               3
//! +---------------+---------------+---------------+---------------+
//! |                             Type                              |
//! +---------------+---------------+---------------+---------------+
//! |                        Sequence Number                        |
//! +---------------+---------------+---------------+---------------+
//! |                        Payload Length                         |
//! +---------------+---------------+---------------+---------------+
//! |                           Checksum                            |
//! +---------------+---------------+---------------+---------------+
//! |                          Payload ...                          |
//! +---------------+---------------+---------------+---------------+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 16 bytes.
//! `checksum` is CRC-32 of the payload for DATA packets and exactly 0 for
//! every other type.

use thiserror::Error;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 16;

/// Maximum payload bytes per DATA packet.
pub const MAX_PAYLOAD: usize = 1456;

/// Maximum datagram size (header + payload) under the path-MTU assumption.
pub const MAX_DATAGRAM: usize = HEADER_LEN + MAX_PAYLOAD;

// Byte offsets of each field within the serialised header.
const OFF_TYPE: usize = 0;
const OFF_SEQ: usize = 4;
const OFF_LEN: usize = 8;
const OFF_CSUM: usize = 12;

/// Packet kind, encoded as a `u32` on the wire (and in trace-log lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Connection open request; `seq_num` carries the connection identifier.
    Start,
    /// Connection close request; `seq_num` repeats the START identifier.
    End,
    /// One file chunk; `seq_num` is the zero-based chunk index.
    Data,
    /// Cumulative acknowledgment, or an echo of a handshake identifier.
    Ack,
}

impl PacketType {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => PacketType::Start,
            1 => PacketType::End,
            2 => PacketType::Data,
            3 => PacketType::Ack,
            _ => return None,
        })
    }

    pub fn as_u32(self) -> u32 {
        match self {
            PacketType::Start => 0,
            PacketType::End => 1,
            PacketType::Data => 2,
            PacketType::Ack => 3,
        }
    }
}

/// A complete protocol datagram: header fields + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub ptype: PacketType,
    /// Connection identifier (START/END), chunk index (DATA), or cumulative
    /// acknowledgment value (ACK).
    pub seq_num: u32,
    /// Byte length of the payload as claimed by the header.
    pub length: u32,
    /// CRC-32 of the payload for DATA; 0 for every other type.
    pub checksum: u32,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a START packet carrying the connection identifier.
    pub fn start(conn_id: u32) -> Self {
        Self::control(PacketType::Start, conn_id)
    }

    /// Build an END packet carrying the connection identifier.
    pub fn end(conn_id: u32) -> Self {
        Self::control(PacketType::End, conn_id)
    }

    /// Build a cumulative ACK.
    pub fn ack(seq_num: u32) -> Self {
        Self::control(PacketType::Ack, seq_num)
    }

    fn control(ptype: PacketType, seq_num: u32) -> Self {
        Self {
            ptype,
            seq_num,
            length: 0,
            checksum: 0,
            payload: Vec::new(),
        }
    }

    /// Build a DATA packet; `length` and `checksum` are derived from `payload`.
    pub fn data(seq_num: u32, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        let checksum = crc32(&payload);
        Self {
            ptype: PacketType::Data,
            seq_num,
            length: payload.len() as u32,
            checksum,
            payload,
        }
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + self.payload.len()];
        buf[OFF_TYPE..OFF_TYPE + 4].copy_from_slice(&self.ptype.as_u32().to_be_bytes());
        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&self.seq_num.to_be_bytes());
        buf[OFF_LEN..OFF_LEN + 4].copy_from_slice(&self.length.to_be_bytes());
        buf[OFF_CSUM..OFF_CSUM + 4].copy_from_slice(&self.checksum.to_be_bytes());
        buf[HEADER_LEN..].copy_from_slice(&self.payload);
        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Returns [`Err`] if `buf` is shorter than [`HEADER_LEN`] or the type
    /// field is unknown.  A payload shorter than the `length` field claims is
    /// **not** an error: the packet decodes with an empty payload and a DATA
    /// packet in that shape simply fails [`is_valid`](Packet::is_valid).
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::TooShort);
        }

        let raw_type = u32::from_be_bytes(buf[OFF_TYPE..OFF_TYPE + 4].try_into().unwrap());
        let ptype = PacketType::from_u32(raw_type).ok_or(PacketError::UnknownType(raw_type))?;
        let seq_num = u32::from_be_bytes(buf[OFF_SEQ..OFF_SEQ + 4].try_into().unwrap());
        let length = u32::from_be_bytes(buf[OFF_LEN..OFF_LEN + 4].try_into().unwrap());
        let checksum = u32::from_be_bytes(buf[OFF_CSUM..OFF_CSUM + 4].try_into().unwrap());

        let end = HEADER_LEN + length as usize;
        let payload = if length > 0 && buf.len() >= end {
            buf[HEADER_LEN..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(Packet {
            ptype,
            seq_num,
            length,
            checksum,
            payload,
        })
    }

    /// Integrity check.
    ///
    /// A DATA packet is valid iff its checksum matches a freshly computed
    /// CRC-32 of its payload; any other type is valid iff its checksum is 0.
    pub fn is_valid(&self) -> bool {
        match self.ptype {
            PacketType::Data => crc32(&self.payload) == self.checksum,
            _ => self.checksum == 0,
        }
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    #[error("buffer too short to contain a header")]
    TooShort,
    /// The type field holds a value outside the protocol's range.
    #[error("unknown packet type {0}")]
    UnknownType(u32),
}

/// CRC-32 of `data` (IEEE polynomial, as produced by zlib).
fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
