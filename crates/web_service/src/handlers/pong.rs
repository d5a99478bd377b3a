//! POST /chat/pong - liveness acknowledgment side channel

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongRequest {
    pub session_id: String,
}

#[derive(Serialize)]
struct PongResponse {
    success: bool,
}

pub async fn handler(
    state: web::Data<AppState>,
    body: web::Json<PongRequest>,
) -> Result<HttpResponse> {
    if !state.registry.record_pong(&body.session_id) {
        return Err(AppError::NotFound("Delivery session not found".into()));
    }
    Ok(HttpResponse::Ok().json(PongResponse { success: true }))
}
