use crate::port::Port;

/// Rejected multiplexer configuration.
///
/// Raised only at construction time; a [`crate::FrameMux`] never exists in
/// an invalid state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The transmission mode identifier is not one of the standard modes.
    #[error("invalid transmission mode {0} (expected 1, 2, 3 or 4)")]
    InvalidMode(u8),

    /// A mode name that is neither a number nor `I`..`IV`.
    #[error("unknown transmission mode {0:?} (expected 1-4 or I-IV)")]
    UnknownModeName(String),

    /// The declared subchannel count disagrees with the size list.
    #[error("subchannel count {count} does not match {sizes} configured sizes")]
    CountMismatch { count: usize, sizes: usize },

    /// No subchannels were configured.
    #[error("at least one subchannel is required")]
    NoSubchannels,

    /// More subchannels than the standard can address.
    #[error("too many subchannels ({count}, max {max})")]
    TooManySubchannels { count: usize, max: usize },

    /// A subchannel was allocated zero capacity units.
    #[error("subchannel {index} has non-positive size")]
    NonPositiveSize { index: usize },

    /// The total allocation does not fit into one CIF.
    #[error("allocation of {requested} CU exceeds CIF capacity of {capacity} CU")]
    CapacityExceeded { requested: usize, capacity: usize },
}

/// Errors raised while feeding or draining a [`crate::FrameMux`].
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// The multiplexer was built with an invalid configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The port does not exist for this configuration.
    #[error("unknown port {0}")]
    UnknownPort(Port),

    /// Data was pushed after the producer signaled end-of-stream.
    #[error("port {0} already finished")]
    PortFinished(Port),

    /// The output stream has already ended.
    #[error("multiplexer output has ended")]
    Ended,

    /// An I/O error occurred while reading or writing CIFs.
    #[error("cif I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink stopped accepting bytes.
    #[error("output closed (incomplete CIF)")]
    ConnectionClosed,

    /// A CIF stream ended in the middle of a CIF.
    #[error("truncated CIF ({got} of {expected} bytes)")]
    TruncatedCif { got: usize, expected: usize },

    /// The number of subchannel slices differs from the layout.
    #[error("{got} subchannel slices supplied, layout has {expected}")]
    SlotCountMismatch { got: usize, expected: usize },

    /// A CIF was written out of stream order.
    #[error("CIF index {got} written where index {expected} is due")]
    OutOfOrder { got: usize, expected: usize },

    /// A buffer handed to the writer does not have the CIF length.
    #[error("CIF length mismatch ({got} bytes, expected {expected})")]
    LengthMismatch { got: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, MuxError>;
