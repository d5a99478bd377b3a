//! GET /chat/stream - persistent SSE connection
//!
//! The connection stays open for the lifetime of the client view.
//! Messages are posted through `/chat/messages`; responses for the
//! session arrive here, on every connection registered under the same
//! session key.

use std::sync::Arc;

use actix_web::http::header;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use chat_core::SseFrame;
use session_manager::SessionRegistry;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Removes the connection (and stops its probe) however the stream
/// ends: clean close, client disconnect, or dead liveness probe.
struct ConnectionGuard {
    registry: Arc<SessionRegistry>,
    session_key: String,
    connection_id: Uuid,
    probe: JoinHandle<()>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.probe.abort();
        self.registry
            .remove_connection(&self.session_key, self.connection_id);
        log::info!("[{}] stream closed", self.session_key);
    }
}

pub async fn handler(state: web::Data<AppState>, query: web::Query<StreamQuery>) -> impl Responder {
    let session_key = query
        .session_id
        .clone()
        .filter(|key| !key.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut handle = state.registry.register(&session_key);
    let probe = session_manager::spawn_liveness_probe(
        state.registry.clone(),
        session_key.clone(),
        handle.connection_id,
    );

    let guard = ConnectionGuard {
        registry: state.registry.clone(),
        session_key,
        connection_id: handle.connection_id,
        probe,
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        loop {
            let frame = handle.next_frame().await;
            let done = matches!(frame, SseFrame::Done);
            yield Ok::<_, actix_web::Error>(web::Bytes::from(frame.to_sse_string()));
            if done {
                break;
            }
        }
    };

    HttpResponse::Ok()
        .append_header((header::CONTENT_TYPE, "text/event-stream"))
        .append_header((header::CACHE_CONTROL, "no-cache"))
        .append_header(("X-Accel-Buffering", "no"))
        .streaming(stream)
}
