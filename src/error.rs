//! Error types shared across the crate.
//!
//! Every failure falls into one of four classes: a missing session, a store
//! read/write failure, a device failure (microphone, geolocation), or a
//! validation failure caught before any write. None of them are retried.

use thiserror::Error;

/// Failures raised by the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed document {collection}/{id}: {source}")]
    Malformed {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document body must be a JSON object")]
    NotAnObject,

    #[error("not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not find config directory")]
    NoConfigDir,
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A mutating action was attempted without a signed-in worker.
    #[error("sign in required")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Microphone, speech engine or geolocation failure.
    #[error("{0}")]
    Device(String),

    #[error("{0}")]
    Validation(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts() {
        let err: Error = StoreError::not_found("people", "x").into();
        assert!(matches!(err, Error::Store(ref e) if e.is_not_found()));
        assert_eq!(err.to_string(), "not found: people/x");
    }

    #[test]
    fn test_validation_message() {
        let err = Error::validation("nickname is required");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "nickname is required");
    }
}
