//! Frame header layout.
//!
//! Wire format (all multi-byte fields big-endian):
//! ```text
//! ┌──────┬──────┬────────────┬────────────┬──────────────┬──────────────────┐
//! │ P1   │ P2   │ Length     │ Data CRC   │ Header CRC   │ Payload          │
//! │ (1B) │ (1B) │ (2B BE)    │ (2B BE)    │ (2B BE)      │ (Length bytes)   │
//! └──────┴──────┴────────────┴────────────┴──────────────┴──────────────────┘
//! ```
//! The header CRC covers the six bytes before it; the data CRC covers the
//! payload only.

use crate::crc::{crc16, INITIAL};

/// Fixed per-frame overhead: preamble (2) + length (2) + data CRC (2) + header CRC (2).
pub const HEADER_SIZE: usize = 8;

/// Number of leading header bytes covered by the header CRC.
pub const HEADER_CRC_SPAN: usize = 6;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// The two sync bytes that open every frame of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Preamble {
    pub first: u8,
    pub second: u8,
}

impl Preamble {
    pub const fn new(first: u8, second: u8) -> Self {
        Self { first, second }
    }

    /// Both bytes in wire order.
    pub const fn to_bytes(self) -> [u8; 2] {
        [self.first, self.second]
    }

    /// True when the two bytes differ, which the resync rule relies on.
    pub const fn is_distinct(self) -> bool {
        self.first != self.second
    }
}

impl std::fmt::Display for Preamble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}{:02X}", self.first, self.second)
    }
}

/// The eight header bytes of one frame, kept exactly as they appeared on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    raw: [u8; HEADER_SIZE],
}

impl FrameHeader {
    /// Compose a header for `length` payload bytes whose checksum is `data_crc`.
    pub fn new(preamble: Preamble, length: u16, data_crc: u16) -> Self {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0] = preamble.first;
        raw[1] = preamble.second;
        raw[2..4].copy_from_slice(&length.to_be_bytes());
        raw[4..6].copy_from_slice(&data_crc.to_be_bytes());
        let header_crc = crc16(&raw[..HEADER_CRC_SPAN], INITIAL);
        raw[6..8].copy_from_slice(&header_crc.to_be_bytes());
        Self { raw }
    }

    /// Wrap already-staged header bytes without validating them.
    pub const fn from_bytes(raw: [u8; HEADER_SIZE]) -> Self {
        Self { raw }
    }

    pub const fn preamble(&self) -> Preamble {
        Preamble::new(self.raw[0], self.raw[1])
    }

    pub const fn length(&self) -> u16 {
        u16::from_be_bytes([self.raw[2], self.raw[3]])
    }

    pub const fn data_crc(&self) -> u16 {
        u16::from_be_bytes([self.raw[4], self.raw[5]])
    }

    pub const fn header_crc(&self) -> u16 {
        u16::from_be_bytes([self.raw[6], self.raw[7]])
    }

    pub const fn as_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.raw
    }

    /// Whether the stored header CRC matches the six bytes before it.
    pub fn is_consistent(&self) -> bool {
        crc16(&self.raw[..HEADER_CRC_SPAN], INITIAL) == self.header_crc()
    }
}
