use std::io;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

use crate::handlers;
use crate::state::AppState;

const DEFAULT_WORKER_COUNT: usize = 4;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/chat")
            .route("/messages", web::post().to(handlers::chat::handler))
            .route("/stream", web::get().to(handlers::stream::handler))
            .route("/pong", web::post().to(handlers::pong::handler))
            .route("/stop-streaming", web::post().to(handlers::stop::handler))
            .route(
                "/switch-branch",
                web::post().to(handlers::switch_branch::handler),
            )
            .route(
                "/messages/regenerate",
                web::post().to(handlers::regenerate::handler),
            )
            .route("/history", web::get().to(handlers::history::handler))
            .route("/sessions", web::get().to(handlers::sessions::list))
            .route("/rename", web::post().to(handlers::sessions::rename))
            .route(
                "/sessions/{chat_id}",
                web::delete().to(handlers::sessions::delete),
            ),
    )
    .route("/health", web::get().to(handlers::health::handler));
}

pub async fn run(state: AppState, port: u16) -> io::Result<()> {
    let state = web::Data::new(state);

    log::info!("Starting chat server on http://127.0.0.1:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .workers(DEFAULT_WORKER_COUNT)
    .bind(format!("127.0.0.1:{port}"))?
    .run()
    .await
}
