//! POST /chat/stop-streaming - conversation-scoped stop request
//!
//! Acts on the generation task, not on a socket: any connection of the
//! session, or a fully disconnected client, can stop a generation.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub chat_id: Uuid,
}

#[derive(Serialize)]
struct StopResponse {
    success: bool,
    message: String,
}

pub async fn handler(state: web::Data<AppState>, body: web::Json<StopRequest>) -> HttpResponse {
    let chat_id = body.chat_id;
    log::info!("[{}] stop request received", chat_id);

    if state.service.stop_streaming(chat_id) {
        HttpResponse::Ok().json(StopResponse {
            success: true,
            message: "Generation stopped".to_string(),
        })
    } else {
        log::warn!("[{}] no generation in flight", chat_id);
        HttpResponse::NotFound().json(StopResponse {
            success: false,
            message: "No active generation found".to_string(),
        })
    }
}
