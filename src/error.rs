//! Typed error taxonomy for the memory core.
//!
//! Library APIs return [`Result`] so transport adapters can map each kind to
//! the right wire response (HTTP status, structured tool error). The binary
//! entry points (`main`, CLI, daemon) stay on `anyhow`.

use thiserror::Error;

/// Result type alias for Engram operations.
pub type Result<T> = std::result::Result<T, EngramError>;

#[derive(Error, Debug)]
pub enum EngramError {
    /// Missing required field, malformed input, out-of-range numeric.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A memory id (or other entity) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An optional surface was invoked while its feature flag is off.
    #[error("feature disabled: {0}")]
    FeatureDisabled(&'static str),

    /// Database I/O failure or schema mismatch.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Embedding model load or inference failure. Never fatal: writes proceed
    /// without vectors and queries fall through to FTS.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// An idempotency ledger row failed to parse. The write path logs this and
    /// treats the key as having no cached result.
    #[error("corrupt ledger entry for key {key}: {source}")]
    CorruptLedger {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngramError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind() {
        let err = EngramError::invalid("upsert requires idempotency_key");
        assert_eq!(
            err.to_string(),
            "invalid argument: upsert requires idempotency_key"
        );
    }

    #[test]
    fn corrupt_ledger_carries_key() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = EngramError::CorruptLedger {
            key: "k1".into(),
            source: parse_err,
        };
        assert!(err.to_string().contains("k1"));
    }
}
