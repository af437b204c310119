use crate::registry::Handle;

/// Errors that can occur while building, parsing, or pumping frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The handle does not name an instance created by this registry.
    #[error("invalid framing instance {0}")]
    InvalidInstance(Handle),

    /// The registry already holds its configured maximum of instances.
    #[error("instance capacity exceeded (max {max})")]
    CapacityExceeded { max: usize },

    /// A buffer of the requested size could not be allocated.
    #[error("allocation of {size} bytes failed")]
    AllocationFailure { size: usize },

    /// Both preamble bytes are identical, which makes resynchronisation ambiguous.
    #[error("preamble bytes must differ (both are {0:#04x})")]
    AmbiguousPreamble(u8),

    /// The payload does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A caller-provided buffer cannot hold a frame header.
    #[error("buffer too short ({size} bytes, need at least {min})")]
    BufferTooShort { size: usize, min: usize },

    /// A received header failed its checksum.
    #[error("header CRC mismatch (expected {expected:#06x}, computed {computed:#06x})")]
    HeaderCrcMismatch { expected: u16, computed: u16 },

    /// A received payload failed its checksum.
    #[error("data CRC mismatch (expected {expected:#06x}, computed {computed:#06x})")]
    DataCrcMismatch { expected: u16, computed: u16 },

    /// A validated header announced a payload the receiver could not buffer.
    #[error("cannot buffer packet of {length} bytes")]
    PacketLength { length: u16 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended or stopped accepting bytes.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
