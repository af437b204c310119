//! Incremental receive state machine.
//!
//! A [`Receiver`] accepts bytes in chunks of any size and reports what it
//! finds through [`PacketEvent`]s. The length field is only trusted once the
//! header CRC has validated, so no buffer is ever allocated for a corrupted
//! header.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::builder::try_allocate;
use crate::crc::{crc16, INITIAL};
use crate::header::{FrameHeader, Preamble, HEADER_CRC_SPAN, HEADER_SIZE, MAX_PAYLOAD};

/// Position of the parser within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    SeekPreamble1,
    SeekPreamble2,
    LenHi,
    LenLo,
    DataCrcHi,
    DataCrcLo,
    HeaderCrcHi,
    HeaderCrcLo,
    DataCollect,
    /// Skipping the payload of a frame whose buffer could not be allocated.
    Discard,
}

/// Discriminant of a [`PacketEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    ValidData,
    HeaderCrcError,
    PacketLengthError,
    DataCrcError,
    PreambleDetected,
}

impl PacketKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PacketKind::ValidData => "valid_data",
            PacketKind::HeaderCrcError => "header_crc_error",
            PacketKind::PacketLengthError => "packet_length_error",
            PacketKind::DataCrcError => "data_crc_error",
            PacketKind::PreambleDetected => "preamble_detected",
        }
    }
}

/// A payload that passed both checksums, with the header it arrived under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPacket {
    pub header: FrameHeader,
    pub payload: Bytes,
}

/// Notification emitted by the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketEvent {
    /// Both preamble bytes were seen; header collection starts.
    PreambleDetected,
    /// The header CRC did not match; the frame was dropped before allocation.
    HeaderCrcError { expected: u16, computed: u16 },
    /// The header was valid but no buffer could be provided for its payload.
    PacketLengthError { length: u16 },
    /// The payload arrived but failed its CRC.
    DataCrcError { expected: u16, computed: u16 },
    /// A complete, verified payload. Ownership passes to the receiver of the event.
    ValidData(ReceivedPacket),
}

impl PacketEvent {
    pub fn kind(&self) -> PacketKind {
        match self {
            PacketEvent::PreambleDetected => PacketKind::PreambleDetected,
            PacketEvent::HeaderCrcError { .. } => PacketKind::HeaderCrcError,
            PacketEvent::PacketLengthError { .. } => PacketKind::PacketLengthError,
            PacketEvent::DataCrcError { .. } => PacketKind::DataCrcError,
            PacketEvent::ValidData(_) => PacketKind::ValidData,
        }
    }

    /// The delivered packet, for [`PacketEvent::ValidData`] only.
    pub fn packet(&self) -> Option<&ReceivedPacket> {
        match self {
            PacketEvent::ValidData(packet) => Some(packet),
            _ => None,
        }
    }

    pub fn into_packet(self) -> Option<ReceivedPacket> {
        match self {
            PacketEvent::ValidData(packet) => Some(packet),
            _ => None,
        }
    }
}

/// Per-link parse state.
#[derive(Debug)]
pub struct Receiver {
    preamble: Preamble,
    max_payload_size: usize,
    state: ReceiveState,
    header: [u8; HEADER_SIZE],
    length: u16,
    expected_header_crc: u16,
    buf: Option<Vec<u8>>,
    discard_remaining: usize,
}

impl Receiver {
    /// Create a receiver that accepts every payload length.
    pub fn new(preamble: Preamble) -> Self {
        Self::with_max_payload(preamble, MAX_PAYLOAD)
    }

    /// Create a receiver that refuses to buffer payloads above `max_payload_size`.
    pub fn with_max_payload(preamble: Preamble, max_payload_size: usize) -> Self {
        Self {
            preamble,
            max_payload_size,
            state: ReceiveState::SeekPreamble1,
            header: [0; HEADER_SIZE],
            length: 0,
            expected_header_crc: 0,
            buf: None,
            discard_remaining: 0,
        }
    }

    pub fn preamble(&self) -> Preamble {
        self.preamble
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    /// True when waiting for the first preamble byte.
    pub fn is_idle(&self) -> bool {
        self.state == ReceiveState::SeekPreamble1
    }

    /// Whether a receive buffer is currently held (in progress or abandoned).
    pub fn has_buffer(&self) -> bool {
        self.buf.is_some()
    }

    /// Abandon any partial frame and wait for a fresh preamble.
    pub fn reset(&mut self) {
        self.state = ReceiveState::SeekPreamble1;
        self.buf = None;
        self.length = 0;
        self.expected_header_crc = 0;
        self.discard_remaining = 0;
    }

    /// Consume `data`, calling `emit` for every event in stream order.
    pub fn feed<F>(&mut self, mut data: &[u8], mut emit: F)
    where
        F: FnMut(PacketEvent),
    {
        while !data.is_empty() {
            let (consumed, event) = self.advance(data);
            if let Some(event) = event {
                emit(event);
            }
            data = &data[consumed..];
        }
    }

    /// Consume one byte. At most one event can result from a single byte.
    pub fn push(&mut self, byte: u8) -> Option<PacketEvent> {
        let (_, event) = self.advance(&[byte]);
        event
    }

    fn advance(&mut self, data: &[u8]) -> (usize, Option<PacketEvent>) {
        match self.state {
            ReceiveState::DataCollect => return self.collect(data),
            ReceiveState::Discard => return (self.discard(data), None),
            _ => {}
        }

        let byte = data[0];
        let event = match self.state {
            ReceiveState::SeekPreamble1 => {
                if byte == self.preamble.first {
                    self.state = ReceiveState::SeekPreamble2;
                }
                None
            }
            ReceiveState::SeekPreamble2 => {
                if byte == self.preamble.second {
                    self.header[0] = self.preamble.first;
                    self.header[1] = self.preamble.second;
                    self.state = ReceiveState::LenHi;
                    trace!(preamble = %self.preamble, "preamble detected");
                    Some(PacketEvent::PreambleDetected)
                } else {
                    if byte != self.preamble.first {
                        self.state = ReceiveState::SeekPreamble1;
                    }
                    None
                }
            }
            ReceiveState::LenHi => {
                self.length = u16::from(byte) << 8;
                self.header[2] = byte;
                self.state = ReceiveState::LenLo;
                None
            }
            ReceiveState::LenLo => {
                self.length |= u16::from(byte);
                self.header[3] = byte;
                self.state = ReceiveState::DataCrcHi;
                None
            }
            ReceiveState::DataCrcHi => {
                self.header[4] = byte;
                self.state = ReceiveState::DataCrcLo;
                None
            }
            ReceiveState::DataCrcLo => {
                self.header[5] = byte;
                self.state = ReceiveState::HeaderCrcHi;
                None
            }
            ReceiveState::HeaderCrcHi => {
                self.expected_header_crc = u16::from(byte) << 8;
                self.state = ReceiveState::HeaderCrcLo;
                None
            }
            ReceiveState::HeaderCrcLo => {
                self.expected_header_crc |= u16::from(byte);
                self.validate_header()
            }
            ReceiveState::DataCollect | ReceiveState::Discard => None,
        };
        (1, event)
    }

    fn validate_header(&mut self) -> Option<PacketEvent> {
        let expected = self.expected_header_crc;
        let computed = crc16(&self.header[..HEADER_CRC_SPAN], INITIAL);
        if computed != expected {
            debug!(expected, computed, "header CRC mismatch");
            self.state = ReceiveState::SeekPreamble1;
            return Some(PacketEvent::HeaderCrcError { expected, computed });
        }

        self.header[6..8].copy_from_slice(&expected.to_be_bytes());
        self.buf = None;

        let length = usize::from(self.length);
        match self.allocate(length) {
            Some(buf) => {
                self.buf = Some(buf);
                if length == 0 {
                    Some(self.complete())
                } else {
                    self.state = ReceiveState::DataCollect;
                    None
                }
            }
            None => {
                warn!(length, max = self.max_payload_size, "cannot buffer packet, skipping payload");
                self.discard_remaining = length;
                self.state = if length == 0 {
                    ReceiveState::SeekPreamble1
                } else {
                    ReceiveState::Discard
                };
                Some(PacketEvent::PacketLengthError {
                    length: self.length,
                })
            }
        }
    }

    fn allocate(&self, length: usize) -> Option<Vec<u8>> {
        if length > self.max_payload_size {
            return None;
        }
        try_allocate(length).ok()
    }

    fn collect(&mut self, data: &[u8]) -> (usize, Option<PacketEvent>) {
        let length = usize::from(self.length);
        // DataCollect is only entered with the buffer already in place.
        let buf = self.buf.get_or_insert_with(Vec::new);

        let take = (length - buf.len()).min(data.len());
        buf.extend_from_slice(&data[..take]);
        if buf.len() < length {
            return (take, None);
        }
        (take, Some(self.complete()))
    }

    fn discard(&mut self, data: &[u8]) -> usize {
        let take = self.discard_remaining.min(data.len());
        self.discard_remaining -= take;
        if self.discard_remaining == 0 {
            self.state = ReceiveState::SeekPreamble1;
        }
        take
    }

    fn complete(&mut self) -> PacketEvent {
        self.state = ReceiveState::SeekPreamble1;
        let header = FrameHeader::from_bytes(self.header);
        let expected = header.data_crc();
        let computed = crc16(self.buf.as_deref().unwrap_or_default(), INITIAL);

        if computed != expected {
            debug!(expected, computed, length = self.length, "data CRC mismatch");
            return PacketEvent::DataCrcError { expected, computed };
        }

        let payload = self.buf.take().map(Bytes::from).unwrap_or_default();
        trace!(length = payload.len(), "packet received");
        PacketEvent::ValidData(ReceivedPacket { header, payload })
    }
}
