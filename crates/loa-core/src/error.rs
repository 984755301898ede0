//! Error types for the LOA engine.

use thiserror::Error;

/// Failure while obtaining or decoding configuration.
///
/// A failed load never partially applies: the engine keeps whatever rule
/// set and ownership tables it had before and reports the error upward.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read at all.
    #[error("configuration source unreadable: {0}")]
    Unreadable(String),

    /// The source was readable but not valid configuration.
    #[error("configuration parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}
