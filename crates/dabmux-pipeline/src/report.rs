use std::fmt;

use dabmux_frame::{EndOfStream, FrameMux, Port};
use serde::Serialize;

/// Why a pipeline stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// A finished producer could not fill its next slot.
    SourceEnded { port: String },
    /// The configured CIF limit was reached.
    Limit { max_cifs: u64 },
    /// A shutdown was requested.
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::SourceEnded { port } => write!(f, "{port} ended"),
            StopReason::Limit { max_cifs } => write!(f, "limit of {max_cifs} CIF(s) reached"),
            StopReason::Shutdown => f.write_str("shutdown requested"),
        }
    }
}

/// Per-port byte accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortReport {
    pub port: String,
    pub slot_len: usize,
    pub received: u64,
    pub consumed: u64,
}

/// Bytes discarded from a port when the output stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResidualReport {
    pub port: String,
    pub bytes: usize,
    pub slot_len: usize,
    /// Bytes past the last whole slot.
    pub partial: usize,
    /// The producer ended off a slot boundary.
    pub premature: bool,
}

/// A producer whose source failed while reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProducerFailure {
    pub port: String,
    pub error: String,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: u8,
    pub frame_len: usize,
    pub cifs: u64,
    pub frames: u64,
    pub bytes_written: u64,
    pub stop: StopReason,
    pub ports: Vec<PortReport>,
    pub residuals: Vec<ResidualReport>,
    pub failures: Vec<ProducerFailure>,
}

impl RunReport {
    pub(crate) fn new(
        mux: &FrameMux,
        end: &EndOfStream,
        stop: StopReason,
        bytes_written: u64,
        failures: Vec<ProducerFailure>,
    ) -> Self {
        Self {
            mode: mux.config().mode().id(),
            frame_len: mux.layout().frame_len(),
            cifs: end.cifs_emitted,
            frames: end.frames_completed,
            bytes_written,
            stop,
            ports: mux
                .ports()
                .map(|p| PortReport {
                    port: p.port().to_string(),
                    slot_len: p.slot_len(),
                    received: p.received(),
                    consumed: p.consumed(),
                })
                .collect(),
            residuals: end
                .residuals
                .iter()
                .map(|r| ResidualReport {
                    port: r.port.to_string(),
                    bytes: r.bytes,
                    slot_len: r.slot_len,
                    partial: r.partial,
                    premature: r.is_premature(),
                })
                .collect(),
            failures,
        }
    }

    /// Whether any producer ended off a slot boundary.
    pub fn has_premature_end(&self) -> bool {
        self.residuals.iter().any(|r| r.premature)
    }

    /// Consumed byte count of a port.
    pub fn consumed(&self, port: Port) -> Option<u64> {
        let name = port.to_string();
        self.ports.iter().find(|p| p.port == name).map(|p| p.consumed)
    }
}
