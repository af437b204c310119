use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::config::ProtocolConfig;
use crate::error::{FrameError, Result};
use crate::header::Preamble;
use crate::receiver::{PacketEvent, ReceivedPacket, Receiver};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads framed packets from any `Read` stream.
///
/// Bytes are pulled in chunks and run through a [`Receiver`]; events queue up
/// until the caller asks for them.
pub struct FrameReader<T> {
    inner: T,
    receiver: Receiver,
    pending: VecDeque<PacketEvent>,
}

impl<T: Read> FrameReader<T> {
    /// Create a reader that accepts every payload length.
    pub fn new(inner: T, preamble: Preamble) -> Self {
        Self::with_config(inner, preamble, ProtocolConfig::default())
    }

    /// Create a reader with an explicit receive allocation ceiling.
    pub fn with_config(inner: T, preamble: Preamble, config: ProtocolConfig) -> Self {
        Self {
            inner,
            receiver: Receiver::with_max_payload(preamble, config.max_payload_size),
            pending: VecDeque::new(),
        }
    }

    /// Read the next receiver event (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` once EOF is reached and
    /// every queued event has been handed out.
    pub fn read_event(&mut self) -> Result<PacketEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            let pending = &mut self.pending;
            self.receiver
                .feed(&chunk[..read], |event| pending.push_back(event));
        }
    }

    /// Read the next verified packet (blocking).
    ///
    /// Corrupt frames are reported as errors. The receiver has already
    /// resynchronised by then, so reading can simply continue.
    pub fn read_frame(&mut self) -> Result<ReceivedPacket> {
        loop {
            match self.read_event()? {
                PacketEvent::ValidData(packet) => return Ok(packet),
                PacketEvent::PreambleDetected => continue,
                PacketEvent::HeaderCrcError { expected, computed } => {
                    return Err(FrameError::HeaderCrcMismatch { expected, computed })
                }
                PacketEvent::DataCrcError { expected, computed } => {
                    return Err(FrameError::DataCrcMismatch { expected, computed })
                }
                PacketEvent::PacketLengthError { length } => {
                    return Err(FrameError::PacketLength { length })
                }
            }
        }
    }

    /// The state machine behind this reader.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Drop any partial frame and queued events.
    pub fn reset(&mut self) {
        self.receiver.reset();
        self.pending.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for FrameReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("receiver", &self.receiver)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
