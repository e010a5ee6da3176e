//! Errors raised while reading, merging, and checking `scribe.json5` layers.

use thiserror::Error;

/// Why a Scribe config could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer file could not be read from disk.
    #[error("cannot read config layer: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// A layer is not valid JSON5.
    #[error("config layer is not valid JSON5: {0}")]
    ParseFailed(#[from] json5::Error),
    /// The merged document does not fit the config model.
    #[error("config does not match the expected shape: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// One setting is unknown or out of range; `path` is dotted, e.g. `orchestrator.max_rounds`.
    #[error("bad config value at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// A rule spanning several settings was broken.
    #[error("inconsistent config: {0}")]
    Invalid(String),
}
