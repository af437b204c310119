//! `tokio_util::codec` adapter over [`Receiver`].
//!
//! The decoder yields every [`PacketEvent`], not just good packets, so a
//! `FramedRead` consumer sees CRC and length errors in stream order.

use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::builder::append_header;
use crate::config::ProtocolConfig;
use crate::error::FrameError;
use crate::header::Preamble;
use crate::receiver::{PacketEvent, Receiver};

#[derive(Debug)]
pub struct FrameCodec {
    receiver: Receiver,
    pending: VecDeque<PacketEvent>,
}

impl FrameCodec {
    pub fn new(preamble: Preamble) -> Self {
        Self::with_config(preamble, ProtocolConfig::default())
    }

    pub fn with_config(preamble: Preamble, config: ProtocolConfig) -> Self {
        Self {
            receiver: Receiver::with_max_payload(preamble, config.max_payload_size),
            pending: VecDeque::new(),
        }
    }

    pub fn preamble(&self) -> Preamble {
        self.receiver.preamble()
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }
}

impl Decoder for FrameCodec {
    type Item = PacketEvent;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<PacketEvent>, FrameError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        if !src.is_empty() {
            let pending = &mut self.pending;
            self.receiver.feed(&src[..], |event| pending.push_back(event));
            let consumed = src.len();
            src.advance(consumed);
        }

        Ok(self.pending.pop_front())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<PacketEvent>, FrameError> {
        // A partial frame at EOF is simply dropped; the peer is gone.
        self.decode(src)
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), FrameError> {
        append_header(dst, payload, self.preamble())?;
        dst.extend_from_slice(payload);
        Ok(())
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        Encoder::<&[u8]>::encode(self, payload.as_ref(), dst)
    }
}
