use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::sync::mpsc;

use rsframe_protocol::{PacketEvent, PacketKind, ProtocolConfig, Registry, MAX_PAYLOAD};
use tracing::{info, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ProtocolConfig {
        max_payload_size: args.max_payload.unwrap_or(MAX_PAYLOAD),
        ..ProtocolConfig::default()
    };

    let (tx, rx) = mpsc::channel::<(PacketEvent, String)>();
    let mut registry: Registry<str> = Registry::new(config);
    let handle = registry
        .create_instance(
            move |event: PacketEvent, source: &str| {
                let _ = tx.send((event, source.to_owned()));
            },
            args.preamble.first,
            args.preamble.second,
        )
        .map_err(|err| frame_error("invalid preamble", err))?;

    let (mut input, source) = open_input(args.path.as_deref())?;
    let mut chunk = vec![0u8; args.chunk_size as usize];
    let mut stats = DecodeStats::default();

    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error(&format!("failed reading {source}"), err)),
        };

        registry
            .feed_bytes(handle, &chunk[..read], source.as_str())
            .map_err(|err| frame_error("decode failed", err))?;

        for (event, origin) in rx.try_iter() {
            stats.record(&event);
            print_event(&event, &origin, format);
            if args.count.is_some_and(|count| stats.valid >= count) {
                return Ok(stats.exit_code());
            }
        }
    }

    let idle = registry
        .instance(handle)
        .map(|instance| instance.receiver().is_idle())
        .map_err(|err| frame_error("decode failed", err))?;
    if !idle {
        warn!(source = %source, "input ended inside a frame");
    }
    info!(
        source = %source,
        valid = stats.valid,
        errors = stats.errors,
        "decode finished"
    );

    Ok(stats.exit_code())
}

fn open_input(path: Option<&Path>) -> CliResult<(Box<dyn Read>, String)> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            Ok((Box::new(file), path.display().to_string()))
        }
        _ => Ok((Box::new(io::stdin().lock()), "stdin".to_string())),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct DecodeStats {
    valid: usize,
    errors: usize,
}

impl DecodeStats {
    fn record(&mut self, event: &PacketEvent) {
        match event.kind() {
            PacketKind::ValidData => self.valid += 1,
            PacketKind::PreambleDetected => {}
            PacketKind::HeaderCrcError | PacketKind::DataCrcError | PacketKind::PacketLengthError => {
                self.errors += 1
            }
        }
    }

    /// Any corrupt or refused frame makes the run fail with `DATA_INVALID`.
    fn exit_code(&self) -> i32 {
        if self.errors == 0 {
            SUCCESS
        } else {
            DATA_INVALID
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_by_kind() {
        let mut stats = DecodeStats::default();
        stats.record(&PacketEvent::PreambleDetected);
        stats.record(&PacketEvent::PacketLengthError { length: 9 });
        stats.record(&PacketEvent::HeaderCrcError {
            expected: 1,
            computed: 2,
        });

        assert_eq!(stats, DecodeStats { valid: 0, errors: 2 });
        assert_eq!(stats.exit_code(), DATA_INVALID);
        assert_eq!(DecodeStats::default().exit_code(), SUCCESS);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = open_input(Some(Path::new("/nonexistent/rsframe-input.bin"))).err().unwrap();
        assert!(err.message.contains("failed opening"));
    }
}
