use std::fmt;
use std::io;

use dabmux_config::ConfigError;
use dabmux_frame::{ConfigurationError, MuxError};
use dabmux_pipeline::PipelineError;
use dabmux_source::SourceError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn configuration_error(context: &str, err: ConfigurationError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn mux_error(context: &str, err: MuxError) -> CliError {
    match err {
        MuxError::Io(source) => io_error(context, source),
        MuxError::Configuration(err) => configuration_error(context, err),
        MuxError::TruncatedCif { .. } | MuxError::LengthMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        MuxError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn source_error(context: &str, err: SourceError) -> CliError {
    match err {
        SourceError::Open { path, source } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        SourceError::Io(source) => io_error(context, source),
        SourceError::NotAStream { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        SourceError::EmptyPattern => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn config_error(context: &str, err: ConfigError) -> CliError {
    match err {
        ConfigError::LoadFailed(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        ConfigError::CompileFailed(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        ConfigError::SchemaViolation(_) | ConfigError::InvalidJson(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ConfigError::Configuration(err) => configuration_error(context, err),
        ConfigError::Source(err) => source_error(context, err),
    }
}

pub fn pipeline_error(context: &str, err: PipelineError) -> CliError {
    match err {
        PipelineError::Mux(err) => mux_error(context, err),
        PipelineError::MissingSource(_) | PipelineError::UnknownSubchannel { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        PipelineError::Spawn { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
