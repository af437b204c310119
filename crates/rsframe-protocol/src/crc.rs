//! Table-driven CRC16-CCITT (polynomial 0x1021).
//!
//! MSB-first, no input/output reflection, no final XOR. The initial value is
//! supplied by the caller so a checksum can be carried across discontiguous
//! buffers: feeding the result over `head` as the start value for `tail` gives
//! the same value as one pass over `head ++ tail`.

/// Generator polynomial.
pub const POLYNOMIAL: u16 = 0x1021;

/// Start value used for every checksum on the wire.
pub const INITIAL: u16 = 0x0000;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC16 of `data`, continuing from `start`.
///
/// Empty input returns `start` unchanged.
pub fn crc16(data: &[u8], start: u16) -> u16 {
    data.iter().fold(start, |crc, &byte| {
        (crc << 8) ^ TABLE[usize::from((crc >> 8) as u8 ^ byte)]
    })
}

/// Compute the CRC16 over several segments as if they were one buffer.
pub fn crc16_segments(segments: &[&[u8]], start: u16) -> u16 {
    segments.iter().fold(start, |crc, segment| crc16(segment, crc))
}

/// Streaming CRC16 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    value: u16,
}

impl Crc16 {
    /// Start a digest from [`INITIAL`].
    pub const fn new() -> Self {
        Self::with_start(INITIAL)
    }

    /// Start a digest from an explicit value.
    pub const fn with_start(start: u16) -> Self {
        Self { value: start }
    }

    /// Fold more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.value = crc16(data, self.value);
        self
    }

    /// Current checksum.
    pub const fn value(&self) -> u16 {
        self.value
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}
