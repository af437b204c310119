//! CRC-guarded packet framing for serial byte streams.
//!
//! Every packet on the wire carries an eight byte header:
//! - two preamble bytes chosen per protocol instance
//! - a big-endian 16-bit payload length
//! - a big-endian CRC16-CCITT over the payload
//! - a big-endian CRC16-CCITT over the six header bytes before it
//!
//! Outbound, the [`builder`] functions assemble headers and frames. Inbound, a
//! [`Receiver`] consumes arbitrary byte chunks and reports a [`PacketEvent`]
//! for every preamble hit, corrupt frame and verified payload. A [`Registry`]
//! owns a bounded set of instances, each with its own preamble, receive state
//! and handler.

pub mod builder;
#[cfg(feature = "async")]
pub mod codec;
pub mod config;
pub mod crc;
pub mod error;
pub mod header;
pub mod reader;
pub mod receiver;
pub mod registry;
pub mod writer;

pub use builder::{
    append_header, build_header_in_place, build_multi_param, build_packet, build_packet_from_buffer,
    build_single_param, encode_header, frame_in_place,
};
#[cfg(feature = "async")]
pub use codec::FrameCodec;
pub use config::{ProtocolConfig, DEFAULT_MAX_INSTANCES, MAX_INSTANCES_LIMIT};
pub use crc::{crc16, crc16_segments, Crc16};
pub use error::{FrameError, Result};
pub use header::{FrameHeader, Preamble, HEADER_SIZE, MAX_PAYLOAD};
pub use reader::FrameReader;
pub use receiver::{PacketEvent, PacketKind, ReceiveState, ReceivedPacket, Receiver};
pub use registry::{Handle, Instance, PacketHandler, Registry};
pub use writer::FrameWriter;
