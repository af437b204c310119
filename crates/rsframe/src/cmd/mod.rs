use clap::{Args, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use rsframe_protocol::Preamble;

use crate::exit::{io_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod crc;
pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wrap a payload in a frame and print it.
    Encode(EncodeArgs),
    /// Scan a byte stream for frames and print every event.
    Decode(DecodeArgs),
    /// Compute the CRC16-CCITT of some bytes.
    Crc(CrcArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Crc(args) => crc::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where payload bytes come from. At most one source may be given.
#[derive(Args, Debug, Default)]
pub struct InputArgs {
    /// UTF-8 string payload.
    #[arg(long, allow_hyphen_values = true, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload (e.g. 48656c6c6f).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

impl InputArgs {
    pub fn has_input(&self) -> bool {
        self.data.is_some() || self.hex.is_some() || self.file.is_some()
    }

    /// Resolve the payload. No source means an empty payload.
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(text) = &self.hex {
            return parse_hex(text);
        }
        if let Some(path) = &self.file {
            return std::fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }

    /// Like [`InputArgs::resolve`], but reads stdin to EOF when no source was given.
    pub fn resolve_or_stdin(&self) -> CliResult<Vec<u8>> {
        if self.has_input() {
            return self.resolve();
        }
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|err| io_error("failed reading stdin", err))?;
        Ok(buf)
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Append a payload segment; repeat to build a scatter-gather frame.
    #[arg(
        long = "segment",
        value_name = "TEXT",
        allow_hyphen_values = true,
        conflicts_with_all = ["data", "hex", "file"]
    )]
    pub segments: Vec<String>,
    /// Preamble as four hex digits (e.g. AA55).
    #[arg(long, env = "RSFRAME_PREAMBLE", value_parser = parse_preamble)]
    pub preamble: Preamble,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Input file; `-` or nothing reads stdin.
    pub path: Option<PathBuf>,
    /// Preamble as four hex digits (e.g. AA55).
    #[arg(long, env = "RSFRAME_PREAMBLE", value_parser = parse_preamble)]
    pub preamble: Preamble,
    /// Bytes handed to the receiver per call.
    #[arg(long, default_value = "4096", value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: u32,
    /// Exit after N valid packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Refuse payloads longer than this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_payload: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CrcArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Start value, decimal or 0x-prefixed hex. Pass a previous result to chain.
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    pub start: u16,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_preamble(input: &str) -> Result<Preamble, String> {
    let bytes = decode_hex(input)?;
    match bytes.as_slice() {
        [first, second] => Ok(Preamble::new(*first, *second)),
        _ => Err(format!(
            "preamble must be exactly two bytes (four hex digits), got {}",
            bytes.len()
        )),
    }
}

pub fn parse_u16(input: &str) -> Result<u16, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid 16-bit value {input:?}: {err}"))
}

pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    decode_hex(input).map_err(CliError::usage)
}

/// Accepts an optional `0x` prefix and ignores spaces and colons.
fn decode_hex(input: &str) -> Result<Vec<u8>, String> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | ':'))
        .collect();
    hex::decode(&digits).map_err(|err| format!("invalid hex {input:?}: {err}"))
}
