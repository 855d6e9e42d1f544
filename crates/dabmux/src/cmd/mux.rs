use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use dabmux_config::SourceSpec;
use dabmux_pipeline::{Pipeline, PipelineConfig, RunReport, ShutdownHandle};
use tracing::info;

use crate::cmd::{load_ensemble, parse_duration, MuxArgs};
use crate::exit::{
    config_error, io_error, pipeline_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, USAGE,
};
use crate::output::{emit, json_line, table, OutputFormat};

pub fn run(args: MuxArgs, format: OutputFormat) -> CliResult<i32> {
    let ensemble = load_ensemble(&args.config, args.allow_symlink)?;
    let config = ensemble
        .mux_config()
        .map_err(|err| config_error("invalid ensemble", err))?;

    let stdin_sources = std::iter::once(&ensemble.fic)
        .chain(ensemble.subchannels.iter().map(|s| &s.source))
        .filter(|source| matches!(source, SourceSpec::Stdin))
        .count();
    if stdin_sources > 1 {
        return Err(CliError::new(
            USAGE,
            format!("{stdin_sources} ports read stdin; at most one may"),
        ));
    }

    let cifs_per_frame = config.mode().cifs_per_frame() as u64;
    let max_cifs = args
        .max_cifs
        .or(args.max_frames.map(|frames| frames.saturating_mul(cifs_per_frame)));
    let pipeline_config = PipelineConfig {
        queue_depth: args.queue_depth.max(1),
        read_chunk_size: args.chunk_size.max(1),
        stall_warn_after: parse_duration(&args.stall_warn)?,
        max_cifs,
    };

    let fic = ensemble
        .open_fic()
        .map_err(|err| config_error("fic source", err))?;
    let subchannels = ensemble
        .open_subchannels()
        .map_err(|err| config_error("subchannel source", err))?;
    if max_cifs.is_none() && fic.is_unbounded() && subchannels.iter().all(|s| s.is_unbounded()) {
        info!("every source is unbounded; running until interrupted");
    }

    let shutdown = ShutdownHandle::new();
    install_ctrlc_handler(shutdown.clone())?;

    let mut pipeline = Pipeline::new(config)
        .with_config(pipeline_config)
        .with_shutdown(shutdown)
        .fic(fic);
    for (index, source) in subchannels.into_iter().enumerate() {
        pipeline = pipeline.subchannel(index, source);
    }

    let output = args.output.or_else(|| ensemble.output_path());
    let (report, stream_on_stdout) = match output {
        Some(path) if path.as_os_str() != "-" => (run_to_file(pipeline, &path)?, false),
        _ => {
            let report = pipeline
                .run(std::io::stdout().lock())
                .map_err(|err| pipeline_error("mux failed", err))?;
            (report, true)
        }
    };

    // The CIF stream owns stdout; the report moves to stderr.
    if stream_on_stdout {
        print_report(&report, format, &mut std::io::stderr());
    } else {
        print_report(&report, format, &mut std::io::stdout());
    }

    if report.failures.is_empty() {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

fn run_to_file(pipeline: Pipeline, path: &Path) -> CliResult<RunReport> {
    let file = File::create(path)
        .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
    let mut sink = BufWriter::new(file);
    let report = pipeline
        .run(&mut sink)
        .map_err(|err| pipeline_error("mux failed", err))?;
    sink.flush()
        .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
    Ok(report)
}

fn print_report(report: &RunReport, format: OutputFormat, out: &mut dyn Write) {
    match format {
        OutputFormat::Json => emit(out, json_line(report)),
        OutputFormat::Table => {
            let mut ports = table(&["PORT", "SLOT", "RECEIVED", "CONSUMED", "RESIDUAL"]);
            for port in &report.ports {
                let residual = report
                    .residuals
                    .iter()
                    .find(|r| r.port == port.port)
                    .map(|r| {
                        if r.premature {
                            format!("{} (premature)", r.bytes)
                        } else {
                            r.bytes.to_string()
                        }
                    })
                    .unwrap_or_else(|| "0".to_string());
                ports.add_row(vec![
                    port.port.clone(),
                    port.slot_len.to_string(),
                    port.received.to_string(),
                    port.consumed.to_string(),
                    residual,
                ]);
            }
            emit(out, summary(report));
            emit(out, ports);
            for failure in &report.failures {
                emit(out, format!("{} failed: {}", failure.port, failure.error));
            }
        }
        OutputFormat::Pretty => {
            emit(out, summary(report));
            for residual in &report.residuals {
                emit(
                    out,
                    format!(
                        "  discarded {} byte(s) from {}{}",
                        residual.bytes,
                        residual.port,
                        if residual.premature { " (premature end)" } else { "" }
                    ),
                );
            }
            for failure in &report.failures {
                emit(out, format!("  {} failed: {}", failure.port, failure.error));
            }
        }
        OutputFormat::Raw => emit(out, report.cifs),
    }
}

fn summary(report: &RunReport) -> String {
    format!(
        "{} CIF(s), {} frame(s), {} bytes written; stopped: {}",
        report.cifs, report.frames, report.bytes_written, report.stop
    )
}

fn install_ctrlc_handler(shutdown: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.request()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
