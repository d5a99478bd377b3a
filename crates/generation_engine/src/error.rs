use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    /// The backend answered with an error payload.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Network failure or timeout reaching the backend.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered 2xx but produced no text.
    #[error("Upstream returned an empty response")]
    EmptyResponse,
}
