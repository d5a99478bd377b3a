//! Generation engine
//!
//! Owns the backend handle, the cancellation flags, and the chunked
//! emission loop that turns one finished completion into a progressive
//! stream of accumulated payloads.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::{CompletionBackend, PromptMessage};
use crate::cancel::CancellationFlags;
use crate::error::GenerationError;

/// Outcome of a chunk emission run.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    /// Exactly the text that was emitted before the loop ended; on a
    /// stop this is the truncation point for persistence.
    pub emitted: String,
    pub stopped: bool,
}

pub struct GenerationEngine {
    backend: Arc<dyn CompletionBackend>,
    flags: CancellationFlags,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl GenerationEngine {
    pub fn new(backend: Arc<dyn CompletionBackend>, chunk_size: usize, chunk_delay: Duration) -> Self {
        Self {
            backend,
            flags: CancellationFlags::new(),
            chunk_size: chunk_size.max(1),
            chunk_delay,
        }
    }

    /// One blocking call to the completion backend. No retries.
    pub async fn generate(&self, context: &[PromptMessage]) -> Result<String, GenerationError> {
        self.backend.complete(context).await
    }

    /// Register the stop flag for a generation about to start.
    pub fn begin(&self, conversation_id: Uuid) -> CancellationToken {
        self.flags.begin(conversation_id)
    }

    /// Conversation-scoped stop request.
    pub fn stop(&self, conversation_id: Uuid) -> bool {
        self.flags.stop(conversation_id)
    }

    pub fn finish(&self, conversation_id: Uuid) {
        self.flags.finish(conversation_id)
    }

    pub fn is_generating(&self, conversation_id: Uuid) -> bool {
        self.flags.is_generating(conversation_id)
    }

    /// Slice `full_text` into fixed-size chunks and hand each ACCUMULATED
    /// prefix to `emit`, pausing `chunk_delay` between slices. The stop
    /// flag is checked before every emission; on stop the remaining text
    /// is withheld but never emitted-then-discarded, so `emitted` is the
    /// exact client-visible prefix.
    pub async fn emit_chunks(
        &self,
        full_text: &str,
        token: &CancellationToken,
        mut emit: impl FnMut(&str),
    ) -> Emission {
        let chars: Vec<char> = full_text.chars().collect();
        let mut end = 0;

        while end < chars.len() {
            if token.is_cancelled() {
                return Emission {
                    emitted: chars[..end].iter().collect(),
                    stopped: true,
                };
            }

            end = (end + self.chunk_size).min(chars.len());
            let accumulated: String = chars[..end].iter().collect();
            emit(&accumulated);

            if end < chars.len() && !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }

        Emission {
            emitted: full_text.to_string(),
            stopped: false,
        }
    }
}
