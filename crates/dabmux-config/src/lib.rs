//! Ensemble configuration files for dabmux.
//!
//! An ensemble file is a JSON document naming the transmission mode, the
//! FIC source and the ordered subchannel list with their sizes in
//! capacity units. Documents are validated against an embedded JSON Schema
//! (draft 2020-12) before deserialization, then checked against the
//! multiplex rules by [`EnsembleConfig::mux_config`].

pub mod config;
pub mod ensemble;
pub mod error;
pub mod loader;
pub mod validator;

pub use config::LoadConfig;
pub use ensemble::{EnsembleConfig, Padding, SourceSpec, SubchannelSpec};
pub use error::{ConfigError, Result};
pub use loader::{from_str, from_str_with_config, load_file, load_file_with_config};
pub use validator::ensemble_schema;
