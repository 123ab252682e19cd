//! Error types for poi-import
//!
//! Row-level problems (bad rating tokens, rows without an identifier) are not
//! errors: they are dropped where they occur. Everything in [`ImportError`]
//! aborts the current call.

use thiserror::Error;

/// Import error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// Caller asked for a source format the importer does not know
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    /// Storage failure while applying a batch (the batch is rolled back)
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited-text input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed structured-text input
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed markup input
    #[error("XML error: {0}")]
    Xml(String),

    /// poi-common error
    #[error("Common error: {0}")]
    Common(#[from] poi_common::Error),
}

impl ImportError {
    /// True for caller-configuration bugs, as opposed to data or storage failures
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ImportError::UnsupportedFormat(_) | ImportError::Common(poi_common::Error::Config(_))
        )
    }
}

impl From<quick_xml::Error> for ImportError {
    fn from(err: quick_xml::Error) -> Self {
        ImportError::Xml(err.to_string())
    }
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
