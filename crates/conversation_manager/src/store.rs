//! Storage collaborator contract
//!
//! The tree is persisted through plain create/read/update/delete calls
//! plus two compound operations that must be atomic: appending a message
//! together with its sibling bookkeeping, and deleting everything newer
//! than a timestamp (used by regeneration). A relational store is the
//! expected production implementation; `MemoryStore` is the in-process
//! reference used by tests and single-node deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use chat_core::{Conversation, Message, Principal};

use crate::error::StoreError;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Atomic append: insert `message` and stamp the new sibling count on
/// every prior sibling, switch the parent's selector to the new message,
/// and move the conversation tip. All-or-nothing.
#[derive(Debug, Clone)]
pub struct AppendOp {
    pub message: Message,
    /// Prior role-matching siblings; their `total_versions` becomes
    /// `message.total_versions`.
    pub bump_siblings: Vec<Uuid>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<()>;
    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>>;
    async fn update_conversation(&self, conversation: &Conversation) -> Result<()>;
    async fn list_conversations(&self, principal: &Principal) -> Result<Vec<Conversation>>;
    async fn delete_conversation(&self, id: Uuid) -> Result<bool>;

    async fn get_message(&self, id: Uuid) -> Result<Option<Message>>;
    async fn update_message(&self, message: &Message) -> Result<()>;
    /// All messages of a conversation, ordered by creation time.
    async fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<Message>>;

    async fn apply_append(&self, op: AppendOp) -> Result<()>;
    /// Delete every message of the conversation strictly newer than
    /// `after`. Returns the number removed.
    async fn delete_after(&self, conversation_id: Uuid, after: DateTime<Utc>) -> Result<u64>;
}

#[derive(Default)]
struct MemoryInner {
    conversations: HashMap<Uuid, Conversation>,
    messages: HashMap<Uuid, Message>,
}

/// In-memory store. One process-wide lock makes the compound operations
/// atomic; per-conversation serialization above it is the tree's job.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.conversations.insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.conversations.get(&id).cloned())
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.conversations.contains_key(&conversation.id) {
            return Err(StoreError::ConversationNotFound(conversation.id));
        }
        inner.conversations.insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn list_conversations(&self, principal: &Principal) -> Result<Vec<Conversation>> {
        let inner = self.inner.lock().unwrap();
        let mut list: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| &c.principal == principal)
            .cloned()
            .collect();
        list.sort_by_key(|c| std::cmp::Reverse(c.updated_at));
        Ok(list)
    }

    async fn delete_conversation(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let existed = inner.conversations.remove(&id).is_some();
        inner.messages.retain(|_, m| m.conversation_id != id);
        Ok(existed)
    }

    async fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.messages.get(&id).cloned())
    }

    async fn update_message(&self, message: &Message) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.messages.contains_key(&message.id) {
            return Err(StoreError::MessageNotFound(message.id));
        }
        inner.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let inner = self.inner.lock().unwrap();
        let mut list: Vec<Message> = inner
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        list.sort_by_key(|m| (m.created_at, m.id));
        Ok(list)
    }

    async fn apply_append(&self, op: AppendOp) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let msg = &op.message;

        if !inner.conversations.contains_key(&msg.conversation_id) {
            return Err(StoreError::ConversationNotFound(msg.conversation_id));
        }

        // A concurrent append that slipped past the caller's count would
        // collide on current_version; refuse the whole operation.
        let collision = inner.messages.values().any(|m| {
            m.conversation_id == msg.conversation_id
                && m.parent == msg.parent
                && m.role == msg.role
                && m.current_version == msg.current_version
        });
        if collision {
            return Err(StoreError::Conflict { parent: msg.parent });
        }

        for sibling_id in &op.bump_siblings {
            match inner.messages.get_mut(sibling_id) {
                Some(sibling) => sibling.total_versions = msg.total_versions,
                None => return Err(StoreError::MessageNotFound(*sibling_id)),
            }
        }

        if let Some(parent_id) = msg.parent {
            match inner.messages.get_mut(&parent_id) {
                Some(parent) => parent.active_child = Some(msg.id),
                None => return Err(StoreError::MessageNotFound(parent_id)),
            }
        }

        inner.messages.insert(msg.id, msg.clone());

        let conversation = inner
            .conversations
            .get_mut(&msg.conversation_id)
            .expect("checked above");
        conversation.current_node = Some(msg.id);
        conversation.updated_at = Utc::now();

        Ok(())
    }

    async fn delete_after(&self, conversation_id: Uuid, after: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();

        let doomed: Vec<Uuid> = inner
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id && m.created_at > after)
            .map(|m| m.id)
            .collect();

        for id in &doomed {
            inner.messages.remove(id);
        }

        // Survivors must not point at deleted children.
        for msg in inner.messages.values_mut() {
            if msg.conversation_id == conversation_id {
                if let Some(child) = msg.active_child {
                    if doomed.contains(&child) {
                        msg.active_child = None;
                    }
                }
            }
        }

        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::Role;

    fn seeded() -> (MemoryStore, Conversation) {
        let store = MemoryStore::new();
        let conv = Conversation::new(Principal::Account("u1".into()), Some("t".into()));
        (store, conv)
    }

    #[tokio::test]
    async fn apply_append_inserts_and_moves_tip() {
        let (store, conv) = seeded();
        store.create_conversation(&conv).await.unwrap();

        let msg = Message::new(conv.id, Role::User, "hi", None);
        store
            .apply_append(AppendOp {
                message: msg.clone(),
                bump_siblings: vec![],
            })
            .await
            .unwrap();

        let stored = store.get_conversation(conv.id).await.unwrap().unwrap();
        assert_eq!(stored.current_node, Some(msg.id));
        assert_eq!(store.messages_for(conv.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn apply_append_bumps_siblings_and_selector() {
        let (store, conv) = seeded();
        store.create_conversation(&conv).await.unwrap();

        let root = Message::new(conv.id, Role::User, "q", None);
        store
            .apply_append(AppendOp {
                message: root.clone(),
                bump_siblings: vec![],
            })
            .await
            .unwrap();

        let first = Message::new(conv.id, Role::Assistant, "a1", Some(root.id));
        store
            .apply_append(AppendOp {
                message: first.clone(),
                bump_siblings: vec![],
            })
            .await
            .unwrap();

        let mut second = Message::new(conv.id, Role::Assistant, "a2", Some(root.id));
        second.current_version = 2;
        second.total_versions = 2;
        store
            .apply_append(AppendOp {
                message: second.clone(),
                bump_siblings: vec![first.id],
            })
            .await
            .unwrap();

        let stored_first = store.get_message(first.id).await.unwrap().unwrap();
        assert_eq!(stored_first.total_versions, 2);
        let stored_root = store.get_message(root.id).await.unwrap().unwrap();
        assert_eq!(stored_root.active_child, Some(second.id));
    }

    #[tokio::test]
    async fn apply_append_detects_version_collision() {
        let (store, conv) = seeded();
        store.create_conversation(&conv).await.unwrap();

        let first = Message::new(conv.id, Role::User, "one", None);
        store
            .apply_append(AppendOp {
                message: first,
                bump_siblings: vec![],
            })
            .await
            .unwrap();

        // Same parent, same role, same current_version.
        let dup = Message::new(conv.id, Role::User, "two", None);
        let err = store
            .apply_append(AppendOp {
                message: dup,
                bump_siblings: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn delete_after_removes_newer_and_clears_selectors() {
        let (store, conv) = seeded();
        store.create_conversation(&conv).await.unwrap();

        let root = Message::new(conv.id, Role::User, "q", None);
        store
            .apply_append(AppendOp {
                message: root.clone(),
                bump_siblings: vec![],
            })
            .await
            .unwrap();

        let mut reply = Message::new(conv.id, Role::Assistant, "a", Some(root.id));
        reply.created_at = root.created_at + chrono::Duration::seconds(1);
        store
            .apply_append(AppendOp {
                message: reply.clone(),
                bump_siblings: vec![],
            })
            .await
            .unwrap();

        let removed = store.delete_after(conv.id, root.created_at).await.unwrap();
        assert_eq!(removed, 1);

        let stored_root = store.get_message(root.id).await.unwrap().unwrap();
        assert_eq!(stored_root.active_child, None);
        assert!(store.get_message(reply.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_conversation_drops_its_messages() {
        let (store, conv) = seeded();
        store.create_conversation(&conv).await.unwrap();
        let msg = Message::new(conv.id, Role::User, "hi", None);
        store
            .apply_append(AppendOp {
                message: msg,
                bump_siblings: vec![],
            })
            .await
            .unwrap();

        assert!(store.delete_conversation(conv.id).await.unwrap());
        assert!(store.get_conversation(conv.id).await.unwrap().is_none());
        assert!(store.messages_for(conv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_conversations_scopes_by_principal() {
        let store = MemoryStore::new();
        let mine = Conversation::new(Principal::Account("me".into()), None);
        let theirs = Conversation::new(Principal::Account("them".into()), None);
        store.create_conversation(&mine).await.unwrap();
        store.create_conversation(&theirs).await.unwrap();

        let listed = store
            .list_conversations(&Principal::Account("me".into()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
    }
}
