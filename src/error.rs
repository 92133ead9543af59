//! Error types for the class generator
//!
//! Only conditions that abort a run live here. Everything recoverable is
//! recorded in [`crate::diagnostics::Diagnostics`] instead.

use thiserror::Error;

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GenError>;

/// Generator errors
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Failed to load {uri}: {reason}")]
    Load { uri: String, reason: String },

    #[error("Cannot resolve fragment of {uri}: segment '{segment}' not found")]
    Fragment { uri: String, segment: String },

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Cannot derive a class name from an empty URI set")]
    EmptyUriSet,

    #[error("No root documents configured")]
    NoRoots,

    #[error("Invalid type override pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenError {
    pub(crate) fn load(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Load {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error denotes a missing node rather than a broken setup
    pub fn is_missing_node(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Fragment { .. })
    }
}
