/// Errors that can occur while loading an ensemble configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The ensemble file could not be loaded.
    #[error("failed to load ensemble: {0}")]
    LoadFailed(String),

    /// The embedded schema could not be compiled.
    #[error("failed to compile ensemble schema: {0}")]
    CompileFailed(String),

    /// The document does not match the ensemble schema.
    #[error("ensemble does not match schema: {0}")]
    SchemaViolation(String),

    /// The document is not valid JSON or does not deserialize.
    #[error("ensemble is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The ensemble is well-formed but not a valid multiplex.
    #[error("invalid multiplex configuration: {0}")]
    Configuration(#[from] dabmux_frame::ConfigurationError),

    /// A port source could not be opened.
    #[error("source error: {0}")]
    Source(#[from] dabmux_source::SourceError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
