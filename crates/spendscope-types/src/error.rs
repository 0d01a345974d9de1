use thiserror::Error;

/// Errors from repository operations (used by trait definitions in spendscope-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the chat engine to its callers.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The session or message does not exist or belongs to another user.
    #[error("not found")]
    NotFound,

    /// The session's history does not allow the requested operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The request itself is malformed (e.g. empty message).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The model call failed or timed out. The cause is for logs only.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A concurrent writer changed the session log during the turn.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ChatError::NotFound,
            RepositoryError::Conflict(msg) => ChatError::PreconditionFailed(msg),
            other => ChatError::Storage(other.to_string()),
        }
    }
}
