use thiserror::Error;

use crate::gatekeeper::Decision;

/// Failures of the durable key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed value stored under '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures inside a navigation handler. None of them ever blocks navigation.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("url '{url}' has no host")]
    MissingHost { url: String },

    #[error("failed to read block list: {0}")]
    Store(#[from] StoreError),
}

impl GateError {
    /// The decision taken when a before-navigate handler hits this error.
    pub fn fallback(&self) -> Decision {
        match self {
            GateError::InvalidUrl { .. } => Decision::Allow,
            GateError::MissingHost { .. } => Decision::Allow,
            GateError::Store(_) => Decision::Allow,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GateError::InvalidUrl { .. } => "invalid_url",
            GateError::MissingHost { .. } => "missing_host",
            GateError::Store(_) => "store",
        }
    }
}
