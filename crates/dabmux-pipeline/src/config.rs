use std::time::Duration;

/// Pipeline scheduling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Chunks each producer may queue ahead of the multiplexer.
    pub queue_depth: usize,
    /// Bytes read from a source per chunk.
    pub read_chunk_size: usize,
    /// How long a starved port may stay silent before a warning is logged.
    /// Logged again every further interval.
    pub stall_warn_after: Duration,
    /// Stop after this many CIFs.
    pub max_cifs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_depth: 16,
            read_chunk_size: 4096,
            stall_warn_after: Duration::from_secs(1),
            max_cifs: None,
        }
    }
}
