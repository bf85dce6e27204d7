//! Error types for Mesa

/// Main error type for Mesa operations
#[derive(Debug, thiserror::Error)]
pub enum MesaError {
    /// Search backend unreachable, returned non-2xx, or sent malformed JSON
    #[error("Provider error: {0}")]
    Provider(String),

    /// Missing suggestion, list, place, or document
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more media objects failed to store.
    ///
    /// `failures` lists a message per failed image, prefixed with its
    /// submission index. Already-stored objects from the same batch are not
    /// rolled back.
    #[error("Upload failed for {} image(s)", .failures.len())]
    Upload { failures: Vec<String> },

    /// Store write failed or was rejected while committing a review
    #[error("Persist error: {0}")]
    Persist(String),

    /// Optimistic-concurrency conflict on the contributor map.
    ///
    /// The underlying record changed between read and write. The caller
    /// must retry from a fresh read; this is never silently dropped.
    #[error("Stale write on {0}")]
    StaleWrite(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Input validation failure (empty query, out-of-range rating, ...)
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement From conversions for common error types

impl From<mongodb::error::Error> for MesaError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for MesaError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for MesaError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for Mesa operations
pub type Result<T> = std::result::Result<T, MesaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_reports_failure_count() {
        let err = MesaError::Upload {
            failures: vec!["image 0: timed out".into(), "image 2: 503".into()],
        };
        assert_eq!(err.to_string(), "Upload failed for 2 image(s)");
    }

    #[test]
    fn test_mongo_error_maps_to_database() {
        let err: MesaError = mongodb::error::Error::custom("boom").into();
        assert!(matches!(err, MesaError::Database(_)));
    }
}
