//! GET /chat/history - active branch of a conversation

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::MessageDto;
use crate::error::Result;
use crate::handlers::principal_from;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "chatId")]
    pub chat_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    chat_id: Uuid,
    messages: Vec<MessageDto>,
}

pub async fn handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let principal = principal_from(&req)?;

    let branch = state.service.history(&principal, query.chat_id).await?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        chat_id: query.chat_id,
        messages: branch.iter().map(MessageDto::from).collect(),
    }))
}
