//! Conversation CRUD: list, rename, delete

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::ConversationDto;
use crate::error::Result;
use crate::handlers::principal_from;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionListResponse {
    sessions: Vec<ConversationDto>,
}

pub async fn list(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let principal = principal_from(&req)?;
    let conversations = state.service.list_conversations(&principal).await?;

    Ok(HttpResponse::Ok().json(SessionListResponse {
        sessions: conversations.iter().map(ConversationDto::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub chat_id: Uuid,
    pub title: String,
}

pub async fn rename(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<RenameRequest>,
) -> Result<HttpResponse> {
    let principal = principal_from(&req)?;
    let conversation = state
        .service
        .rename(&principal, body.chat_id, &body.title)
        .await?;

    Ok(HttpResponse::Ok().json(ConversationDto::from(&conversation)))
}

pub async fn delete(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let principal = principal_from(&req)?;
    let chat_id = path.into_inner();
    state.service.delete_conversation(&principal, chat_id).await?;

    Ok(HttpResponse::NoContent().finish())
}
