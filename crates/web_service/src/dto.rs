//! Response shapes for the REST endpoints

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use chat_core::{Conversation, Message, Role};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub message_id: Uuid,
    pub chat_id: Uuid,
    pub role: Role,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub current_version: u32,
    pub total_versions: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageDto {
    fn from(msg: &Message) -> Self {
        Self {
            message_id: msg.id,
            chat_id: msg.conversation_id,
            role: msg.role,
            content: msg.content.clone(),
            parent_id: msg.parent,
            current_version: msg.current_version,
            total_versions: msg.total_versions,
            created_at: msg.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub chat_id: Uuid,
    pub title: Option<String>,
    pub current_node: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationDto {
    fn from(conv: &Conversation) -> Self {
        Self {
            chat_id: conv.id,
            title: conv.title.clone(),
            current_node: conv.current_node,
            created_at: conv.created_at,
            updated_at: conv.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::Principal;
    use serde_json::json;

    #[test]
    fn message_dto_uses_camel_case_keys() {
        let msg = Message::new(Uuid::new_v4(), Role::User, "hi", None);
        let value = serde_json::to_value(MessageDto::from(&msg)).unwrap();
        assert_eq!(value["messageId"], json!(msg.id));
        assert_eq!(value["currentVersion"], json!(1));
        assert!(value.get("parentId").is_some());
    }

    #[test]
    fn conversation_dto_carries_the_tip() {
        let mut conv = Conversation::new(Principal::Account("u".into()), Some("t".into()));
        let tip = Uuid::new_v4();
        conv.current_node = Some(tip);
        let value = serde_json::to_value(ConversationDto::from(&conv)).unwrap();
        assert_eq!(value["currentNode"], json!(tip));
        assert_eq!(value["chatId"], json!(conv.id));
    }
}
