//! Threaded scheduling around the frame multiplexer.
//!
//! Each port gets a producer thread reading its source into a bounded
//! queue. The mux loop pulls CIFs from [`dabmux_frame::FrameMux`], blocks
//! on whichever port is starved, and writes every CIF to the output. It
//! stops cleanly after the last complete CIF when a source ends, a CIF
//! limit is reached, or a [`ShutdownHandle`] is triggered.

pub mod config;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod producer;
pub mod report;

pub use config::PipelineConfig;
pub use control::{PortEvent, ShutdownHandle};
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
pub use producer::BoxedSource;
pub use report::{PortReport, ProducerFailure, ResidualReport, RunReport, StopReason};
