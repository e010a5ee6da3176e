//! Configuration models and JSON5 config loading.
//!
//! This crate owns the Scribe config schema, validation, and the small
//! user/cwd layering used by the binary and embedders.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
