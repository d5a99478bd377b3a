//! POST /chat/switch-branch - select another sibling version
//!
//! Returns the new active branch, root-first.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::MessageDto;
use crate::error::Result;
use crate::handlers::principal_from;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchBranchRequest {
    pub chat_id: Uuid,
    pub message_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwitchBranchResponse {
    chat_id: Uuid,
    messages: Vec<MessageDto>,
}

pub async fn handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SwitchBranchRequest>,
) -> Result<HttpResponse> {
    let principal = principal_from(&req)?;

    let branch = state
        .service
        .switch_branch(&principal, body.chat_id, body.message_id)
        .await?;

    Ok(HttpResponse::Ok().json(SwitchBranchResponse {
        chat_id: body.chat_id,
        messages: branch.iter().map(MessageDto::from).collect(),
    }))
}
