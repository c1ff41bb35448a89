//! Device configuration
//!
//! Board-agnostic settings with compiled-in defaults. The firmware reads
//! them from an embedded TOML file and falls back to the defaults when it
//! does not parse or validate.

pub mod types;

pub use types::*;
