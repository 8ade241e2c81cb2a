//! Typed errors for every caller-facing operation.
//!
//! The chat layer renders error kinds directly to end users, so each
//! failure mode gets its own variant rather than a stringly wrapper.

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, StationError>;

#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Transport failure talking to the audio engine's control port.
    /// Fatal to the current request; never retried automatically.
    #[error("audio engine unreachable: {source}")]
    EngineUnreachable {
        #[source]
        source: std::io::Error,
    },

    /// The engine answered, but the response did not match the expected
    /// shape. The raw payload is kept for the log.
    #[error("malformed engine response")]
    Protocol { raw: String },

    #[error("invalid media identifier: {0:?}")]
    InvalidMediaId(String),

    #[error("song already exists: {0}")]
    AlreadyExists(String),

    #[error("song not found: {0}")]
    NotFound(String),

    #[error("duration {secs}s exceeds the {max}s limit")]
    DurationExceeded { secs: u64, max: u64 },

    /// The requester is neither the submitter nor an administrator.
    #[error("not allowed")]
    Forbidden,

    /// Catalog uniqueness violation on insert.
    #[error("duplicate catalog entry: {0}")]
    Duplicate(String),

    #[error("query too short, need at least {min} characters")]
    QueryTooShort { min: usize },

    #[error("nothing is playing")]
    NothingPlaying,

    #[error("no random pick could be queued after {attempts} attempts")]
    RandomQueueExhausted { attempts: usize },

    /// The external fetch tool failed or reported an incomplete transfer.
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("catalog failure: {0}")]
    Catalog(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StationError {
    pub(crate) fn unreachable(source: std::io::Error) -> Self {
        Self::EngineUnreachable { source }
    }

    pub(crate) fn protocol(raw: impl Into<Vec<u8>>) -> Self {
        Self::Protocol {
            raw: String::from_utf8_lossy(&raw.into()).into_owned(),
        }
    }
}

impl From<crate::catalog::CatalogError> for StationError {
    fn from(err: crate::catalog::CatalogError) -> Self {
        use crate::catalog::CatalogError;
        match err {
            CatalogError::NotFound(id) => Self::NotFound(id),
            CatalogError::Duplicate(id) => Self::Duplicate(id),
            CatalogError::Storage(msg) => Self::Catalog(msg),
        }
    }
}
