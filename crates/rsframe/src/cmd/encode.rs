use rsframe_protocol::{FrameHeader, PacketEvent, ProtocolConfig, Registry, HEADER_SIZE};
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut registry: Registry<()> = Registry::new(ProtocolConfig::default());
    let handle = registry
        .create_instance(|_: PacketEvent, _: &()| {}, args.preamble.first, args.preamble.second)
        .map_err(|err| frame_error("invalid preamble", err))?;

    let built = if args.segments.is_empty() {
        let payload = args.input.resolve_or_stdin()?;
        registry.build_single_param(&payload, handle)
    } else {
        let segments: Vec<&[u8]> = args.segments.iter().map(String::as_bytes).collect();
        registry.build_multi_param(&segments, handle)
    };
    let frame = built.map_err(|err| frame_error("encode failed", err))?;

    let header = frame
        .first_chunk::<HEADER_SIZE>()
        .map(|raw| FrameHeader::from_bytes(*raw))
        .ok_or_else(|| CliError::new(INTERNAL, "encoder produced a frame without a header"))?;
    debug!(
        preamble = %header.preamble(),
        length = header.length(),
        "frame encoded"
    );

    print_frame(&frame, &header, format);
    Ok(SUCCESS)
}
