//! Transmission-frame multiplexing for DAB.
//!
//! This is the core layer of dabmux. A [`FrameMux`] takes one FIC byte stream
//! and N subchannel byte streams and emits Common Interleaved Frames:
//! - The frame's FIC block at the start of the first CIF of each frame
//! - Each subchannel's slot of `size × 8` bytes, in subchannel order
//! - Optional zero padding up to the full MSC capacity
//!
//! Output is a plain byte stream; the layout is implied by the mode and the
//! subchannel sizes.

#[cfg(feature = "async")]
pub mod codec;
pub mod error;
pub mod layout;
pub mod mode;
pub mod mux;
pub mod port;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use codec::CifCodec;
pub use error::{ConfigurationError, MuxError, Result};
pub use layout::{encode_cif, CifLayout, CifSlices, FrameLayout, MscPadding, MuxConfig};
pub use mode::{TransmissionMode, CU_BYTES, FIB_BYTES, MSC_CUS_PER_CIF};
pub use mux::{Cif, EndOfStream, FrameMux, MuxPoll, PortResidual};
pub use port::{Port, PortBuffer};
pub use reader::CifReader;
pub use writer::CifWriter;
