//! Public SDK surface for Scribe.
//!
//! This crate re-exports the core building blocks and provides a small
//! initialization helper to keep consumer setup consistent.

/// Re-export for convenience.
pub use scribe_rs_config as config;
pub use scribe_rs_context as context;
pub use scribe_rs_core as core;
/// Re-export for convenience.
pub use scribe_rs_protocol as protocol;
pub use scribe_rs_tools as tools;
pub use scribe_rs_vault as vault;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
