use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::config::LoadConfig;
use crate::ensemble::EnsembleConfig;
use crate::error::{ConfigError, Result};
use crate::validator::{ensemble_validator, validate_document};

/// Load an ensemble file with default limits.
pub fn load_file(path: impl AsRef<Path>) -> Result<EnsembleConfig> {
    load_file_with_config(path, LoadConfig::default())
}

/// Load an ensemble file with explicit limits.
///
/// Relative paths inside the document resolve against the file's directory.
pub fn load_file_with_config(path: impl AsRef<Path>, config: LoadConfig) -> Result<EnsembleConfig> {
    let path = path.as_ref();
    let path_metadata = std::fs::symlink_metadata(path)
        .map_err(|err| ConfigError::LoadFailed(format!("{}: {err}", path.display())))?;
    let file_type = path_metadata.file_type();

    if file_type.is_symlink() && config.reject_symlinks {
        return Err(ConfigError::LoadFailed(format!(
            "refusing to load ensemble symlink: {}",
            path.display()
        )));
    }

    let file = std::fs::File::open(path).map_err(|err| {
        ConfigError::LoadFailed(format!("failed opening ensemble {}: {err}", path.display()))
    })?;
    let opened_metadata = file
        .metadata()
        .map_err(|err| ConfigError::LoadFailed(err.to_string()))?;

    if !opened_metadata.is_file() {
        return Err(ConfigError::LoadFailed(format!(
            "ensemble is not a regular file: {}",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        if !file_type.is_symlink() && !same_file_identity(&path_metadata, &opened_metadata) {
            return Err(ConfigError::LoadFailed(format!(
                "ensemble file changed during load: {}",
                path.display()
            )));
        }
    }

    if opened_metadata.len() > config.max_file_size as u64 {
        return Err(ConfigError::LoadFailed(format!(
            "ensemble file too large ({} bytes): {}",
            opened_metadata.len(),
            path.display()
        )));
    }

    let read_limit = u64::try_from(config.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            ConfigError::LoadFailed(format!("failed reading ensemble {}: {err}", path.display()))
        })?;
    if content.len() > config.max_file_size {
        return Err(ConfigError::LoadFailed(format!(
            "ensemble file too large while reading: {}",
            path.display()
        )));
    }

    let mut ensemble = from_str_with_config(&content, config)?;
    ensemble.base_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf);
    debug!(
        path = %path.display(),
        mode = ensemble.mode,
        subchannels = ensemble.subchannels.len(),
        "loaded ensemble"
    );
    Ok(ensemble)
}

/// Parse and validate an ensemble document.
pub fn from_str(document: &str) -> Result<EnsembleConfig> {
    from_str_with_config(document, LoadConfig::default())
}

/// Parse and validate an ensemble document with explicit limits.
pub fn from_str_with_config(document: &str, config: LoadConfig) -> Result<EnsembleConfig> {
    let value: Value = serde_json::from_str(document)?;
    from_value_with_config(value, config)
}

/// Validate an already-parsed document against the ensemble schema.
pub fn from_value_with_config(value: Value, config: LoadConfig) -> Result<EnsembleConfig> {
    let validator = ensemble_validator()?;
    validate_document(&value, &validator, config.max_reported_violations)?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(unix)]
fn same_file_identity(
    path_metadata: &std::fs::Metadata,
    opened_metadata: &std::fs::Metadata,
) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}
