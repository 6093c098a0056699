use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("xbeelink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: xbeelink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("XBEELINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: node={}, async={}, cli=true",
        cfg!(feature = "node"),
        cfg!(feature = "async")
    );
    println!(
        "frame_types: 0x{:02X} transmit-request, 0x{:02X} explicit-rx-indicator",
        xbeelink_frame::TRANSMIT_REQUEST,
        xbeelink_frame::EXPLICIT_RX_INDICATOR
    );

    Ok(SUCCESS)
}
