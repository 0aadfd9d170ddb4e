use thiserror::Error;

/// Custom error types for the index cache library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexCacheError {
    /// A required sub-cache was not supplied at construction time
    #[error("missing required collaborator: {0} cache")]
    MissingCollaborator(&'static str),

    /// A sub-cache failed to shut down
    #[error("{cache} cache failed to close: {reason}")]
    CloseFailed { cache: &'static str, reason: String },

    /// A sub-cache failed to clear its entries
    #[error("{cache} cache failed to clear: {reason}")]
    ClearFailed { cache: &'static str, reason: String },
}

/// Result type alias for index cache operations
pub type Result<T> = std::result::Result<T, IndexCacheError>;
