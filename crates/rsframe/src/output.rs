use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rsframe_protocol::{FrameHeader, PacketEvent};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One line of `decode` output.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct EventOutput {
    pub event: &'static str,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_crc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_crc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl EventOutput {
    pub fn from_event(event: &PacketEvent, source: &str) -> Self {
        let mut out = Self {
            event: event.kind().as_str(),
            source: source.to_string(),
            length: None,
            expected_crc: None,
            computed_crc: None,
            payload_hex: None,
            payload: None,
        };
        match event {
            PacketEvent::PreambleDetected => {}
            PacketEvent::HeaderCrcError { expected, computed }
            | PacketEvent::DataCrcError { expected, computed } => {
                out.expected_crc = Some(crc_hex(*expected));
                out.computed_crc = Some(crc_hex(*computed));
            }
            PacketEvent::PacketLengthError { length } => out.length = Some(*length),
            PacketEvent::ValidData(packet) => {
                out.length = Some(packet.header.length());
                out.payload_hex = Some(hex::encode(&packet.payload));
                out.payload = Some(payload_preview(&packet.payload));
            }
        }
        out
    }

    fn detail(&self) -> String {
        match (&self.expected_crc, &self.computed_crc, &self.payload) {
            (Some(expected), Some(computed), _) => format!("expected={expected} computed={computed}"),
            (_, _, Some(payload)) => payload.clone(),
            _ => String::new(),
        }
    }
}

/// `encode` output: the header fields and the complete frame.
#[derive(Serialize, Debug)]
pub struct FrameOutput {
    pub preamble: String,
    pub length: u16,
    pub data_crc: String,
    pub header_crc: String,
    pub frame_size: usize,
    pub frame_hex: String,
}

impl FrameOutput {
    pub fn new(frame: &[u8], header: &FrameHeader) -> Self {
        Self {
            preamble: header.preamble().to_string(),
            length: header.length(),
            data_crc: crc_hex(header.data_crc()),
            header_crc: crc_hex(header.header_crc()),
            frame_size: frame.len(),
            frame_hex: hex::encode(frame),
        }
    }
}

pub fn print_event(event: &PacketEvent, source: &str, format: OutputFormat) {
    if format == OutputFormat::Raw {
        if let Some(packet) = event.packet() {
            print_raw(&packet.payload);
        }
        return;
    }

    let out = EventOutput::from_event(event, source);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "SOURCE", "LENGTH", "DETAIL"])
                .add_row(vec![
                    out.event.to_string(),
                    out.source.clone(),
                    out.length.map(|l| l.to_string()).unwrap_or_default(),
                    out.detail(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            let mut line = format!("event={} source={}", out.event, out.source);
            if let Some(length) = out.length {
                line.push_str(&format!(" length={length}"));
            }
            let detail = out.detail();
            if !detail.is_empty() {
                line.push(' ');
                line.push_str(&detail);
            }
            println!("{line}");
        }
    }
}

pub fn print_frame(frame: &[u8], header: &FrameHeader, format: OutputFormat) {
    let out = FrameOutput::new(frame, header);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PREAMBLE", "LENGTH", "DATA CRC", "HEADER CRC", "FRAME"])
                .add_row(vec![
                    out.preamble.clone(),
                    out.length.to_string(),
                    out.data_crc.clone(),
                    out.header_crc.clone(),
                    out.frame_hex.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.frame_hex),
        OutputFormat::Raw => print_raw(frame),
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn crc_hex(crc: u16) -> String {
    format!("0x{crc:04X}")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
