use dabmux_frame::TransmissionMode;
use dabmux_pipeline::PipelineConfig;
use serde::Serialize;

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{json_line, table, OutputFormat};

#[derive(Serialize, Debug)]
struct ModeInfo {
    mode: String,
    cifs_per_frame: usize,
    fic_block: usize,
    frame_duration_ms: u128,
    capacity_cus: usize,
}

impl From<TransmissionMode> for ModeInfo {
    fn from(mode: TransmissionMode) -> Self {
        Self {
            mode: mode.to_string(),
            cifs_per_frame: mode.cifs_per_frame(),
            fic_block: mode.fic_block_size(),
            frame_duration_ms: mode.frame_duration().as_millis(),
            capacity_cus: mode.cif_capacity_cus(),
        }
    }
}

/// Scheduling defaults a `mux` run starts from.
#[derive(Serialize, Debug)]
struct PipelineDefaults {
    queue_depth: usize,
    read_chunk_size: usize,
    stall_warn_after_ms: u128,
}

#[derive(Serialize, Debug)]
struct EnvInfoOutput {
    version: String,
    target: String,
    os: String,
    arch: String,
    features: Vec<&'static str>,
    modes: Vec<ModeInfo>,
    pipeline: PipelineDefaults,
    log_filter: Option<String>,
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let defaults = PipelineConfig::default();
    let output = EnvInfoOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        target: build_target(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        features: enabled_features(),
        modes: TransmissionMode::ALL.into_iter().map(ModeInfo::from).collect(),
        pipeline: PipelineDefaults {
            queue_depth: defaults.queue_depth,
            read_chunk_size: defaults.read_chunk_size,
            stall_warn_after_ms: defaults.stall_warn_after.as_millis(),
        },
        log_filter: std::env::var("RUST_LOG").ok(),
    };

    print_envinfo(&output, format);
    Ok(SUCCESS)
}

fn build_target() -> String {
    match option_env!("DABMUX_BUILD_TARGET") {
        Some(target) => target.to_string(),
        None => format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
    }
}

fn enabled_features() -> Vec<&'static str> {
    [
        ("pipeline", cfg!(feature = "pipeline")),
        ("config", cfg!(feature = "config")),
        ("async", cfg!(feature = "async")),
        ("cli", cfg!(feature = "cli")),
    ]
    .into_iter()
    .filter_map(|(name, enabled)| enabled.then_some(name))
    .collect()
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", json_line(output)),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("dabmux {} ({})", output.version, output.target);
            println!("  features: {}", output.features.join(", "));
            println!(
                "  pipeline: queue depth {}, read chunk {} bytes, stall warning after {} ms",
                output.pipeline.queue_depth,
                output.pipeline.read_chunk_size,
                output.pipeline.stall_warn_after_ms
            );
            println!(
                "  RUST_LOG: {}",
                output.log_filter.as_deref().unwrap_or("(not set)")
            );

            let mut modes = table(&["MODE", "CIFS/FRAME", "FIC BLOCK", "FRAME MS", "CAPACITY CU"]);
            for mode in &output.modes {
                modes.add_row(vec![
                    mode.mode.clone(),
                    mode.cifs_per_frame.to_string(),
                    mode.fic_block.to_string(),
                    mode.frame_duration_ms.to_string(),
                    mode.capacity_cus.to_string(),
                ]);
            }
            println!("{modes}");
        }
        OutputFormat::Raw => println!("{}", output.version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_transmission_mode() {
        let modes: Vec<ModeInfo> = TransmissionMode::ALL.into_iter().map(ModeInfo::from).collect();

        let blocks: Vec<usize> = modes.iter().map(|m| m.fic_block).collect();
        assert_eq!(blocks, [384, 96, 128, 192]);
        assert_eq!(modes[0].cifs_per_frame, 4);
        assert_eq!(modes[0].frame_duration_ms, 96);
        assert_eq!(modes[2].capacity_cus, 16 + 864);
    }

    #[test]
    fn build_target_names_arch_and_os() {
        let target = build_target();
        assert!(target.contains(std::env::consts::ARCH));
    }

    #[test]
    fn cli_build_reports_its_features() {
        let features = enabled_features();
        assert!(features.contains(&"cli"));
        assert!(features.contains(&"pipeline"));
    }

    #[test]
    fn json_carries_modes_and_defaults() {
        let output = EnvInfoOutput {
            version: "0.1.0".to_string(),
            target: "x86_64-linux".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            features: vec!["cli"],
            modes: vec![ModeInfo::from(TransmissionMode::II)],
            pipeline: PipelineDefaults {
                queue_depth: 4,
                read_chunk_size: 4096,
                stall_warn_after_ms: 1000,
            },
            log_filter: None,
        };

        let json: serde_json::Value = serde_json::from_str(&json_line(&output)).unwrap();
        assert_eq!(json["version"], "0.1.0");
        assert_eq!(json["modes"][0]["fic_block"], 96);
        assert_eq!(json["pipeline"]["queue_depth"], 4);
        assert!(json["log_filter"].is_null());
    }
}
