use thiserror::Error;

use crate::catalog::CatalogError;
use crate::processor::ProcessorError;

/// Fatal errors that abort a whole run.
///
/// Problems found in documents are never reported this way; they end up in
/// the target's [`Report`](crate::Report).
#[derive(Debug, Error)]
pub enum CheckerError {
    /// A reference could not be resolved to a readable document.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("IO error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// The base type set failed to load cleanly.
    #[error("Invalid common types: {0}")]
    Commons(String),

    /// The catalog could not be ordered or queried.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Unknown processor: {0}")]
    UnknownProcessor(String),

    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

impl CheckerError {
    pub fn io(location: impl Into<String>, source: std::io::Error) -> Self {
        CheckerError::Io {
            location: location.into(),
            source,
        }
    }
}
