//! Message and Conversation entities
//!
//! A conversation is a tree of messages: any message may have several
//! sibling versions under the same parent, and each parent remembers
//! which child is currently selected via `active_child`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn in a conversation tree.
///
/// `parent` is the only ownership edge (many children reference one
/// parent). `active_child` is a selector cache: it records which child
/// is currently shown, and following it from the root must reach the
/// conversation's `current_node`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_child: Option<Uuid>,
    /// 1-based position among role-matching siblings under the same parent.
    pub current_version: u32,
    /// Count of role-matching siblings under the same parent; identical
    /// across the whole sibling set.
    pub total_versions: u32,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        conversation_id: Uuid,
        role: Role,
        content: impl Into<String>,
        parent: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.into(),
            parent,
            active_child: None,
            current_version: 1,
            total_versions: 1,
            created_at: Utc::now(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A conversation owns its messages and tracks the tip of the active
/// branch through `current_node`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub principal: Principal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_node: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(principal: Principal, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            principal,
            title,
            current_node: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derive a display title from the first user message.
    pub fn title_from_content(content: &str) -> String {
        const MAX_TITLE_CHARS: usize = 120;
        let trimmed = content.trim();
        if trimmed.chars().count() <= MAX_TITLE_CHARS {
            trimmed.to_string()
        } else {
            trimmed.chars().take(MAX_TITLE_CHARS).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_starts_as_sole_version() {
        let conv = Conversation::new(Principal::Fingerprint("fp".into()), None);
        let msg = Message::new(conv.id, Role::User, "hello", None);

        assert!(msg.is_root());
        assert_eq!(msg.current_version, 1);
        assert_eq!(msg.total_versions, 1);
        assert!(msg.active_child.is_none());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }

    #[test]
    fn title_from_content_truncates_long_input() {
        let long = "x".repeat(500);
        let title = Conversation::title_from_content(&long);
        assert_eq!(title.chars().count(), 120);
    }

    #[test]
    fn message_round_trips_through_json() {
        let msg = Message::new(Uuid::new_v4(), Role::User, "hi", Some(Uuid::new_v4()));
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, msg.id);
        assert_eq!(back.parent, msg.parent);
    }
}
