//! Serialized tree mutations
//!
//! `append`, `switch_branch`, and `regenerate` for one conversation must
//! not interleave: sibling version numbering and selector bookkeeping
//! are not commutative. A per-conversation async mutex serializes them;
//! a store-level version collision (possible with an external store and
//! multiple processes) is retried under the same lock.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use chat_core::{Message, Role};

use crate::error::{StoreError, TreeError};
use crate::graph;
use crate::store::{AppendOp, Store};

const APPEND_ATTEMPTS: usize = 3;

pub struct ConversationTree<S: ?Sized> {
    store: Arc<S>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<S: Store + ?Sized> ConversationTree<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, conversation_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(conversation_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn message_map(&self, conversation_id: Uuid) -> Result<HashMap<Uuid, Message>, TreeError> {
        let messages = self.store.messages_for(conversation_id).await?;
        Ok(messages.into_iter().map(|m| (m.id, m)).collect())
    }

    /// Append a new message under `parent`, versioned against its
    /// role-matching siblings, and make it the conversation tip.
    pub async fn append(
        &self,
        conversation_id: Uuid,
        parent: Option<Uuid>,
        role: Role,
        content: &str,
    ) -> Result<Message, TreeError> {
        self.append_with_id(conversation_id, parent, role, content, Uuid::new_v4())
            .await
    }

    /// `append` with a caller-chosen message id. Used when the id was
    /// already announced on the wire before the row exists (assistant
    /// messages are persisted only after generation finishes).
    pub async fn append_with_id(
        &self,
        conversation_id: Uuid,
        parent: Option<Uuid>,
        role: Role,
        content: &str,
        message_id: Uuid,
    ) -> Result<Message, TreeError> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        self.store
            .get_conversation(conversation_id)
            .await?
            .ok_or(TreeError::ConversationNotFound)?;

        for attempt in 1..=APPEND_ATTEMPTS {
            let map = self.message_map(conversation_id).await?;

            if let Some(parent_id) = parent {
                if !map.contains_key(&parent_id) {
                    return Err(TreeError::MessageNotFound);
                }
            }

            let siblings = graph::sibling_set(&map, parent, role);
            let version = siblings.len() as u32 + 1;

            let mut message = Message::new(conversation_id, role, content, parent);
            message.id = message_id;
            message.current_version = version;
            message.total_versions = version;

            let op = AppendOp {
                message: message.clone(),
                bump_siblings: siblings.iter().map(|m| m.id).collect(),
            };

            match self.store.apply_append(op).await {
                Ok(()) => return Ok(message),
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(
                        conversation_id = %conversation_id,
                        attempt,
                        "sibling version conflict, retrying append"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TreeError::Conflict)
    }

    /// Root-first path from the conversation root to `current_node`.
    /// Empty for a conversation with no messages.
    pub async fn active_branch(&self, conversation_id: Uuid) -> Result<Vec<Message>, TreeError> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or(TreeError::ConversationNotFound)?;

        let Some(tip) = conversation.current_node else {
            return Ok(Vec::new());
        };

        let map = self.message_map(conversation_id).await?;
        Ok(graph::branch_to(&map, tip))
    }

    /// Root-first path ending at `message_id` itself; the generation
    /// context for a reply to that message.
    pub async fn branch_for_reply_context(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<Vec<Message>, TreeError> {
        let map = self.message_map(conversation_id).await?;
        if !map.contains_key(&message_id) {
            return Err(TreeError::MessageNotFound);
        }
        Ok(graph::branch_to(&map, message_id))
    }

    /// Select `target`'s branch: point its parent's selector at it, walk
    /// forward to the leaf that was last active beneath it, and move the
    /// conversation tip there. Version bookkeeping is untouched.
    pub async fn switch_branch(
        &self,
        conversation_id: Uuid,
        target_id: Uuid,
    ) -> Result<Vec<Message>, TreeError> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let mut conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or(TreeError::ConversationNotFound)?;

        let mut map = self.message_map(conversation_id).await?;
        let target = map.get(&target_id).cloned().ok_or(TreeError::MessageNotFound)?;

        if let Some(parent_id) = target.parent {
            let mut parent = map
                .get(&parent_id)
                .cloned()
                .ok_or(TreeError::MessageNotFound)?;
            if parent.active_child != Some(target_id) {
                parent.active_child = Some(target_id);
                self.store.update_message(&parent).await?;
                map.insert(parent.id, parent);
            }
        }

        let leaf = graph::walk_active_forward(&map, target_id);
        conversation.current_node = Some(leaf);
        conversation.updated_at = chrono::Utc::now();
        self.store.update_conversation(&conversation).await?;

        Ok(graph::branch_to(&map, leaf))
    }

    /// Destructive redo-from-here on an assistant message: everything
    /// strictly newer is deleted, the version counter is bumped, and the
    /// message becomes the conversation tip. Its content stays stale
    /// until the new generation overwrites it in place.
    pub async fn regenerate(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, TreeError> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let mut conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or(TreeError::ConversationNotFound)?;

        let mut message = self
            .store
            .get_message(message_id)
            .await?
            .filter(|m| m.conversation_id == conversation_id)
            .ok_or(TreeError::MessageNotFound)?;

        if message.role != Role::Assistant {
            return Err(TreeError::InvalidRole);
        }

        let removed = self
            .store
            .delete_after(conversation_id, message.created_at)
            .await?;
        tracing::debug!(
            conversation_id = %conversation_id,
            message_id = %message_id,
            removed,
            "regenerate discarded newer messages"
        );

        message.current_version += 1;
        message.active_child = None;
        self.store.update_message(&message).await?;

        conversation.current_node = Some(message.id);
        conversation.updated_at = chrono::Utc::now();
        self.store.update_conversation(&conversation).await?;

        Ok(message)
    }

    /// Rewrite a message's content in place (generation persistence).
    pub async fn overwrite_content(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        content: &str,
    ) -> Result<Message, TreeError> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let mut message = self
            .store
            .get_message(message_id)
            .await?
            .filter(|m| m.conversation_id == conversation_id)
            .ok_or(TreeError::MessageNotFound)?;

        message.content = content.to_string();
        self.store.update_message(&message).await?;
        Ok(message)
    }
}
