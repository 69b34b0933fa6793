use thiserror::Error;

/// Errors surfaced by the option store and catalog loading.
///
/// Request-time language resolution never produces these; signals that
/// cannot be interpreted degrade to the default language instead.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("option store I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in option store: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed option '{key}': {reason}")]
    MalformedOption { key: String, reason: String },

    #[error("option store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, RouterError>;
