use std::fmt;
use std::io;

use rsframe_protocol::FrameError;

// Exit codes follow the sysexits-style layout used across our CLIs.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::AmbiguousPreamble(_) | FrameError::InvalidInstance(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::PayloadTooLarge { .. }
        | FrameError::BufferTooShort { .. }
        | FrameError::HeaderCrcMismatch { .. }
        | FrameError::DataCrcMismatch { .. }
        | FrameError::PacketLength { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_payload_is_data_invalid() {
        let err = frame_error(
            "encode failed",
            FrameError::PayloadTooLarge {
                size: 70_000,
                max: 65_535,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("encode failed: "));
    }

    #[test]
    fn ambiguous_preamble_is_usage() {
        let err = frame_error("preamble rejected", FrameError::AmbiguousPreamble(0xAA));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err = frame_error(
            "read failed",
            FrameError::Io(io::Error::from(io::ErrorKind::PermissionDenied)),
        );
        assert_eq!(err.code, PERMISSION_DENIED);

        let err = io_error("read failed", io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn capacity_is_internal() {
        let err = frame_error("create failed", FrameError::CapacityExceeded { max: 8 });
        assert_eq!(err.code, INTERNAL);
    }
}
