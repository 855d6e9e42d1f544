//! Producer-side byte sources for the multiplexer ports.
//!
//! Provides a unified `Read` stream over:
//! - Files, FIFOs and character devices
//! - Standard input
//! - Repeating byte patterns and zero fill (test and filler producers)
//!
//! This is the lowest layer of dabmux. The pipeline drives every port
//! producer through the [`SourceStream`] type provided here.

pub mod error;
pub mod file;
pub mod stream;

pub use error::{Result, SourceError};
pub use file::open_file;
pub use stream::SourceStream;
