use dabmux_frame::TransmissionMode;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("dabmux {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: dabmux");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: pipeline={}, config={}, async={}, cli=true",
        cfg!(feature = "pipeline"),
        cfg!(feature = "config"),
        cfg!(feature = "async")
    );
    let modes = TransmissionMode::ALL
        .iter()
        .map(|mode| mode.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("modes: {modes}");

    Ok(SUCCESS)
}
