use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("rsframe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: rsframe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("RSFRAME_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("RSFRAME_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: async={}, cli=true",
        cfg!(feature = "async")
    );
    println!("crc: CRC16-CCITT poly=0x1021 init=0x0000");

    Ok(SUCCESS)
}
