//! POST /chat/messages/regenerate - redo an assistant turn
//!
//! Destructive: everything after the target is discarded, the target's
//! version is bumped, and its content is rewritten in place when the new
//! generation completes. Events stream through the session.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use chat_service::RegenerateRequest;

use crate::error::Result;
use crate::handlers::principal_from;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateBody {
    pub session_id: String,
    pub chat_id: Uuid,
    pub message_id: Uuid,
}

pub async fn handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<RegenerateBody>,
) -> Result<HttpResponse> {
    let principal = principal_from(&req)?;
    let body = body.into_inner();

    let ack = state
        .service
        .regenerate(RegenerateRequest {
            session_key: body.session_id,
            principal,
            chat_id: body.chat_id,
            message_id: body.message_id,
        })
        .await?;

    Ok(HttpResponse::Ok().json(ack))
}
