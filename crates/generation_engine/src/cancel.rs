//! Per-conversation cancellation flags
//!
//! Stop requests are keyed by conversation, not by connection: any
//! client (connected or not) can stop the generation in flight for a
//! conversation. Cancellation is cooperative; the emission loop checks
//! the flag between chunks.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Default)]
pub struct CancellationFlags {
    tokens: DashMap<Uuid, CancellationToken>,
}

impl CancellationFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh token for a generation about to start. A token
    /// left over from an earlier generation on the same conversation is
    /// cancelled and replaced.
    pub fn begin(&self, conversation_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.tokens.insert(conversation_id, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Flip the stop flag for a conversation's in-flight generation.
    /// Returns false when nothing is generating.
    pub fn stop(&self, conversation_id: Uuid) -> bool {
        match self.tokens.get(&conversation_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the token when the generation task exits.
    pub fn finish(&self, conversation_id: Uuid) {
        self.tokens.remove(&conversation_id);
    }

    pub fn is_generating(&self, conversation_id: Uuid) -> bool {
        self.tokens.contains_key(&conversation_id)
    }
}
