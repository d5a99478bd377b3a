use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(uuid::Uuid),

    #[error("Message not found: {0}")]
    MessageNotFound(uuid::Uuid),

    #[error("Sibling version conflict under parent {parent:?}")]
    Conflict { parent: Option<uuid::Uuid> },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Message not found in this conversation")]
    MessageNotFound,

    #[error("Can only regenerate assistant messages")]
    InvalidRole,

    #[error("Sibling version conflict persisted after retries")]
    Conflict,

    #[error(transparent)]
    Store(#[from] StoreError),
}
