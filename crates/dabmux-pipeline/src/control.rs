use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

/// What a producer thread sends to the multiplexer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    /// Bytes read from the source, in order.
    Data(Bytes),
    /// The source reached end of stream.
    End,
    /// Reading failed. The port is treated as ended.
    Failed(String),
}

/// Requests a clean stop of a running pipeline from another thread.
///
/// The pipeline stops after the CIF it is currently writing.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the pipeline to stop.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
