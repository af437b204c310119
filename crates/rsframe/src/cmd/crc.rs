use rsframe_protocol::crc16;
use serde::Serialize;

use crate::cmd::CrcArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{crc_hex, print_json, OutputFormat};

#[derive(Serialize, Debug)]
struct CrcOutput {
    crc: String,
    value: u16,
    start: String,
    length: usize,
}

pub fn run(args: CrcArgs, format: OutputFormat) -> CliResult<i32> {
    let data = args.input.resolve_or_stdin()?;
    let value = crc16(&data, args.start);
    let out = CrcOutput {
        crc: crc_hex(value),
        value,
        start: crc_hex(args.start),
        length: data.len(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("crc16-ccitt  {}", out.crc);
            println!("start        {}", out.start);
            println!("bytes        {}", out.length);
        }
        OutputFormat::Raw => println!("{}", out.crc),
    }
    Ok(SUCCESS)
}
