use serde::Serialize;

use crate::cmd::layout::LayoutView;
use crate::cmd::{load_ensemble, ValidateArgs};
use crate::exit::{config_error, CliResult, SUCCESS};
use crate::output::{json_line, OutputFormat};

#[derive(Serialize)]
struct ValidateOutput {
    valid: bool,
    path: String,
    subchannels: usize,
    sources_opened: bool,
    layout: LayoutView,
}

pub fn run(args: ValidateArgs, format: OutputFormat) -> CliResult<i32> {
    let ensemble = load_ensemble(&args.config, false)?;
    let config = ensemble
        .mux_config()
        .map_err(|err| config_error("invalid ensemble", err))?;

    if args.open_sources {
        ensemble
            .open_fic()
            .map_err(|err| config_error("fic source", err))?;
        ensemble
            .open_subchannels()
            .map_err(|err| config_error("subchannel source", err))?;
    }

    let output = ValidateOutput {
        valid: true,
        path: args.config.display().to_string(),
        subchannels: config.subchannel_count(),
        sources_opened: args.open_sources,
        layout: LayoutView::new(&config, Some(&ensemble)),
    };

    match format {
        OutputFormat::Json => println!("{}", json_line(&output)),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{}: valid", output.path);
            println!(
                "  mode {}, {} subchannel(s), {} bytes per frame, {} MSC CU free",
                output.layout.mode,
                output.subchannels,
                output.layout.frame_len,
                output.layout.free_cus
            );
            if output.sources_opened {
                println!("  all sources opened");
            }
        }
        OutputFormat::Raw => println!("valid"),
    }
    Ok(SUCCESS)
}
