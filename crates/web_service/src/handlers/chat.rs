//! POST /chat/messages - post a user message
//!
//! Acknowledges synchronously; the assistant response streams through
//! the session's live connections.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use chat_service::PostMessageRequest;

use crate::error::Result;
use crate::handlers::principal_from;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesRequest {
    pub session_id: String,
    pub content: String,
    #[serde(default)]
    pub chat_id: Option<Uuid>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

pub async fn handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<MessagesRequest>,
) -> Result<HttpResponse> {
    let principal = principal_from(&req)?;
    let body = body.into_inner();

    let ack = state
        .service
        .post_message(PostMessageRequest {
            session_key: body.session_id,
            principal,
            chat_id: body.chat_id,
            parent_id: body.parent_id,
            content: body.content,
        })
        .await?;

    Ok(HttpResponse::Ok().json(ack))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_with_optional_fields_absent() {
        let json = r#"{"sessionId": "s1", "content": "Hello"}"#;
        let req: MessagesRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.session_id, "s1");
        assert_eq!(req.content, "Hello");
        assert!(req.chat_id.is_none());
        assert!(req.parent_id.is_none());
    }

    #[test]
    fn request_deserializes_with_branching_fields() {
        let chat = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let json = format!(
            r#"{{"sessionId": "s1", "content": "x", "chatId": "{}", "parentId": "{}"}}"#,
            chat, parent
        );
        let req: MessagesRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.chat_id, Some(chat));
        assert_eq!(req.parent_id, Some(parent));
    }
}
