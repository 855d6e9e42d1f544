use dabmux_frame::Port;

/// Errors that can occur while running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Multiplexer or output error.
    #[error("mux error: {0}")]
    Mux(#[from] dabmux_frame::MuxError),

    /// A port has no source attached.
    #[error("no source attached to port {0}")]
    MissingSource(Port),

    /// A source was attached to a subchannel the configuration lacks.
    #[error("subchannel {index} out of range (configured: {count})")]
    UnknownSubchannel { index: usize, count: usize },

    /// A producer thread could not be started.
    #[error("failed to spawn producer for {port}: {source}")]
    Spawn {
        port: Port,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
