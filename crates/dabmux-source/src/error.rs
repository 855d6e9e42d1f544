use std::path::PathBuf;

/// Errors that can occur while opening or reading a byte source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to open the source file.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The path exists but cannot be streamed (e.g. a directory).
    #[error("not a readable stream: {path}")]
    NotAStream { path: PathBuf },

    /// A repeating pattern must contain at least one byte.
    #[error("pattern source needs at least one byte")]
    EmptyPattern,

    /// An I/O error occurred while reading.
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
