use std::path::{Path, PathBuf};

use dabmux_frame::{MscPadding, MuxConfig};
use dabmux_source::{open_file, SourceStream};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An ensemble file: transmission mode, FIC source and subchannels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnsembleConfig {
    /// Transmission mode identifier (1..=4).
    pub mode: u8,
    #[serde(default)]
    pub padding: Padding,
    pub fic: SourceSpec,
    pub subchannels: Vec<SubchannelSpec>,
    /// Where the CIF stream is written. Stdout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// One subchannel entry, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubchannelSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Allocated size in capacity units.
    pub size_cu: u32,
    pub source: SourceSpec,
}

/// Where a port's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSpec {
    File {
        path: PathBuf,
    },
    Stdin,
    Pattern {
        bytes: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u64>,
    },
    Zero {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u64>,
    },
}

/// MSC padding setting as written in ensemble files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    #[default]
    None,
    Zero,
}

impl From<Padding> for MscPadding {
    fn from(padding: Padding) -> Self {
        match padding {
            Padding::None => MscPadding::None,
            Padding::Zero => MscPadding::Zero,
        }
    }
}

impl EnsembleConfig {
    /// Validate the multiplex and build its configuration.
    pub fn mux_config(&self) -> Result<MuxConfig> {
        let sizes: Vec<u32> = self.subchannels.iter().map(|s| s.size_cu).collect();
        let config = MuxConfig::from_mode_id(self.mode, self.subchannels.len(), &sizes)?;
        Ok(config.with_padding(self.padding.into()))
    }

    /// Display label of a subchannel (`subch-N` when unlabeled).
    pub fn label(&self, index: usize) -> String {
        self.subchannels
            .get(index)
            .and_then(|s| s.label.clone())
            .unwrap_or_else(|| format!("subch-{index}"))
    }

    /// Output path resolved against the ensemble's directory.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output
            .as_deref()
            .map(|path| resolve(self.base_dir.as_deref(), path))
    }

    /// Open the FIC source.
    pub fn open_fic(&self) -> Result<SourceStream> {
        self.fic.open(self.base_dir.as_deref())
    }

    /// Open every subchannel source, in index order.
    pub fn open_subchannels(&self) -> Result<Vec<SourceStream>> {
        self.subchannels
            .iter()
            .map(|s| s.source.open(self.base_dir.as_deref()))
            .collect()
    }
}

impl SourceSpec {
    /// Open the source. Relative file paths resolve against `base`.
    pub fn open(&self, base: Option<&Path>) -> Result<SourceStream> {
        let stream = match self {
            SourceSpec::File { path } => open_file(resolve(base, path))?,
            SourceSpec::Stdin => SourceStream::stdin(),
            SourceSpec::Pattern { bytes, limit } => SourceStream::pattern(bytes.clone(), *limit)?,
            SourceSpec::Zero { limit } => SourceStream::zeros(*limit),
        };
        Ok(stream)
    }
}

fn resolve(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dabmux_frame::{ConfigurationError, TransmissionMode};

    fn ensemble(sizes: &[u32]) -> EnsembleConfig {
        EnsembleConfig {
            mode: 1,
            padding: Padding::None,
            fic: SourceSpec::Zero { limit: None },
            subchannels: sizes
                .iter()
                .map(|&size_cu| SubchannelSpec {
                    label: None,
                    size_cu,
                    source: SourceSpec::Pattern {
                        bytes: vec![1, 1],
                        limit: None,
                    },
                })
                .collect(),
            output: None,
            base_dir: None,
        }
    }

    #[test]
    fn builds_mux_config() {
        let config = ensemble(&[15, 15]).mux_config().unwrap();
        assert_eq!(config.mode(), TransmissionMode::I);
        assert_eq!(config.sizes(), &[15, 15]);
        assert_eq!(config.padding(), MscPadding::None);
    }

    #[test]
    fn surfaces_configuration_errors() {
        let err = ensemble(&[600, 600]).mux_config().unwrap_err();
        assert!(matches!(
            err,
            crate::ConfigError::Configuration(ConfigurationError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn labels_fall_back_to_index() {
        let mut config = ensemble(&[8, 8]);
        config.subchannels[1].label = Some("news".to_string());
        assert_eq!(config.label(0), "subch-0");
        assert_eq!(config.label(1), "news");
    }

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let mut config = ensemble(&[8]);
        config.output = Some(PathBuf::from("out/frames.bin"));
        config.base_dir = Some(PathBuf::from("/srv/ensemble"));
        assert_eq!(
            config.output_path(),
            Some(PathBuf::from("/srv/ensemble/out/frames.bin"))
        );

        config.output = Some(PathBuf::from("/abs/frames.bin"));
        assert_eq!(config.output_path(), Some(PathBuf::from("/abs/frames.bin")));
    }

    #[test]
    fn opens_synthetic_sources() {
        let config = ensemble(&[8, 8]);
        assert_eq!(config.open_fic().unwrap().kind(), "zero");
        let subchannels = config.open_subchannels().unwrap();
        assert_eq!(subchannels.len(), 2);
        assert_eq!(subchannels[0].kind(), "pattern");
    }
}
