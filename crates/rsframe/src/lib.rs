//! CRC-guarded packet framing for serial byte streams.
//!
//! This crate re-exports [`rsframe_protocol`] and, with the `cli` feature,
//! ships the `rsframe` binary for encoding and decoding frames from the shell.
//!
//! # Crate Structure
//!
//! - [`protocol`] - wire format, builders, receive state machine, registry
//! - [`codec`] - `tokio_util` codec (behind the `async` feature)

/// Re-export protocol types.
pub mod protocol {
    pub use rsframe_protocol::*;
}

/// Re-export the async codec (requires `async` feature).
#[cfg(feature = "async")]
pub mod codec {
    pub use rsframe_protocol::codec::*;
}

pub use rsframe_protocol::{
    FrameError, Handle, PacketEvent, PacketHandler, Preamble, ProtocolConfig, ReceivedPacket,
    Registry, Result,
};
