use thiserror::Error;

/// Failure to validate a raw lookup response against the result schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing or invalid field: {0}")]
    MissingField(&'static str),
}

/// Failure of the external lookup call itself.
///
/// Both variants collapse to the same generic failure at the user boundary,
/// but they are logged differently: a malformed payload means the service
/// contract drifted, while a transport failure is expected to be transient.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup transport failed: {0}")]
    Transport(String),

    #[error("lookup returned an unreadable payload: {0}")]
    Malformed(String),
}

/// Failure in a recent-search storage backend.
///
/// Never fatal: the cache layer consumes these and degrades to empty.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store content could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}
