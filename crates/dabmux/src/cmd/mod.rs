use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use dabmux_config::{load_file_with_config, EnsembleConfig, LoadConfig};
use dabmux_frame::{MscPadding, MuxConfig, TransmissionMode};

use crate::exit::{config_error, configuration_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod envinfo;
pub mod inspect;
pub mod layout;
pub mod mux;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Multiplex an ensemble into a CIF stream.
    Mux(MuxArgs),
    /// Show the CIF layout of a configuration.
    Layout(LayoutArgs),
    /// Check an ensemble file without running it.
    Validate(ValidateArgs),
    /// Read a CIF stream back and summarize it.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Mux(args) => mux::run(args, format),
        Command::Layout(args) => layout::run(args, format),
        Command::Validate(args) => validate::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct MuxArgs {
    /// Ensemble file.
    pub config: PathBuf,
    /// Output path, overriding the ensemble's. `-` writes to stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Stop after N CIFs.
    #[arg(long, value_name = "N")]
    pub max_cifs: Option<u64>,
    /// Stop after N transmission frames.
    #[arg(long, value_name = "N", conflicts_with = "max_cifs")]
    pub max_frames: Option<u64>,
    /// Chunks each producer may queue ahead of the multiplexer.
    #[arg(long, default_value = "16")]
    pub queue_depth: usize,
    /// Bytes per producer read.
    #[arg(long, default_value = "4096")]
    pub chunk_size: usize,
    /// Warn when a port stays starved this long (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub stall_warn: String,
    /// Accept an ensemble file reached through a symlink.
    #[arg(long)]
    pub allow_symlink: bool,
}

/// Where a layout comes from: an ensemble file or explicit flags.
#[derive(Args, Debug)]
pub struct LayoutSpecArgs {
    /// Ensemble file to take the mode and sizes from.
    #[arg(long, conflicts_with_all = ["mode", "sizes"])]
    pub config: Option<PathBuf>,
    /// Transmission mode (1-4 or I-IV).
    #[arg(long)]
    pub mode: Option<TransmissionMode>,
    /// Subchannel sizes in CUs (comma-separated).
    #[arg(long, value_delimiter = ',', requires = "mode")]
    pub sizes: Option<Vec<u32>>,
    /// Zero-pad the MSC to full capacity.
    #[arg(long, requires = "mode")]
    pub pad: bool,
}

#[derive(Args, Debug)]
pub struct LayoutArgs {
    #[command(flatten)]
    pub spec: LayoutSpecArgs,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Ensemble file.
    pub config: PathBuf,
    /// Also open every source to check it exists and is readable.
    #[arg(long)]
    pub open_sources: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// CIF stream to read (`-` for stdin).
    pub input: PathBuf,
    #[command(flatten)]
    pub spec: LayoutSpecArgs,
    /// List the first N CIFs.
    #[arg(long, value_name = "N", default_value = "0")]
    pub list: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

/// Load an ensemble file, mapping failures to CLI exit codes.
pub fn load_ensemble(path: &std::path::Path, allow_symlink: bool) -> CliResult<EnsembleConfig> {
    let config = LoadConfig {
        reject_symlinks: !allow_symlink,
        ..LoadConfig::default()
    };
    load_file_with_config(path, config)
        .map_err(|err| config_error(&format!("invalid ensemble {}", path.display()), err))
}

/// Resolve a multiplex configuration and optional ensemble from layout flags.
pub fn resolve_layout(spec: &LayoutSpecArgs) -> CliResult<(MuxConfig, Option<EnsembleConfig>)> {
    if let Some(path) = &spec.config {
        let ensemble = load_ensemble(path, false)?;
        let config = ensemble
            .mux_config()
            .map_err(|err| config_error("invalid ensemble", err))?;
        return Ok((config, Some(ensemble)));
    }

    let Some(mode) = spec.mode else {
        return Err(CliError::new(
            USAGE,
            "either --config or --mode with --sizes is required",
        ));
    };
    let sizes = spec.sizes.clone().unwrap_or_default();
    let padding = if spec.pad {
        MscPadding::Zero
    } else {
        MscPadding::None
    };
    let config = MuxConfig::new(mode, sizes.len(), &sizes)
        .map_err(|err| configuration_error("invalid layout", err))?
        .with_padding(padding);
    Ok((config, None))
}

/// Parse a duration such as `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
