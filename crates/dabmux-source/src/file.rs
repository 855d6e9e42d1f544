use std::path::Path;

use tracing::debug;

use crate::error::{Result, SourceError};
use crate::stream::SourceStream;

/// Open a file (or FIFO / character device) as a byte source.
///
/// Directories are rejected up front so the failure names the path instead
/// of surfacing later as a read error on the producer thread.
pub fn open_file(path: impl AsRef<Path>) -> Result<SourceStream> {
    let path = path.as_ref();

    let metadata = std::fs::metadata(path).map_err(|e| SourceError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !is_streamable(&metadata.file_type()) {
        return Err(SourceError::NotAStream {
            path: path.to_path_buf(),
        });
    }

    let file = std::fs::File::open(path).map_err(|e| SourceError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;

    debug!(?path, len = metadata.len(), "opened file source");
    Ok(SourceStream::from_file(file))
}

#[cfg(unix)]
fn is_streamable(file_type: &std::fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;

    file_type.is_file() || file_type.is_fifo() || file_type.is_char_device()
}

#[cfg(not(unix))]
fn is_streamable(file_type: &std::fs::FileType) -> bool {
    file_type.is_file()
}
