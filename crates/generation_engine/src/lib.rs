//! generation_engine - turning a branch context into assistant text
//!
//! The completion backend is a black box reached through one blocking
//! request/response call; there is no token streaming upstream. Progressive
//! delivery is produced locally by slicing the finished text into
//! fixed-size chunks, each carrying the accumulated content so far, with
//! a cooperative per-conversation stop flag checked between slices.

pub mod backend;
pub mod cancel;
pub mod engine;
pub mod error;

pub use backend::{CompletionBackend, OpenAiBackend, PromptMessage};
pub use cancel::CancellationFlags;
pub use engine::{Emission, GenerationEngine};
pub use error::GenerationError;
