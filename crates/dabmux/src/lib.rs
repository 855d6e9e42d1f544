//! DAB transmission-frame multiplexer.
//!
//! dabmux assembles a Fast Information Channel stream and up to 64
//! subchannel streams into the Common Interleaved Frames of a DAB
//! transmission frame, ready for channel coding and modulation.
//!
//! # Crate Structure
//!
//! - [`frame`]: Modes, CIF layout, port buffers and the frame multiplexer
//! - [`source`]: File, stdin and synthetic byte sources for ports
//! - [`config`]: JSON ensemble files (behind `config` feature)
//! - [`pipeline`]: Threaded producers driving the multiplexer (behind `pipeline` feature)

/// Re-export frame types.
pub mod frame {
    pub use dabmux_frame::*;
}

/// Re-export source types.
pub mod source {
    pub use dabmux_source::*;
}

/// Re-export configuration types (requires `config` feature).
#[cfg(feature = "config")]
pub mod config {
    pub use dabmux_config::*;
}

/// Re-export pipeline types (requires `pipeline` feature).
#[cfg(feature = "pipeline")]
pub mod pipeline {
    pub use dabmux_pipeline::*;
}
