use conversation_manager::{StoreError, TreeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing or malformed request field; generation never starts.
    #[error("{0}")]
    Validation(String),

    /// Conversation or message absent, or not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    /// The caller has no live delivery session to receive events on.
    #[error("Delivery session not found. Establish the stream connection first.")]
    SessionNotFound,

    /// Surfaced before any tree mutation; nothing is persisted.
    #[error("Daily limit exceeded. Requests left: {remaining}")]
    QuotaExceeded { remaining: u32 },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
