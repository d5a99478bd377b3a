//! web_service - HTTP surface for the chat backend
//!
//! Thin actix-web layer over `chat_service`: request parsing, principal
//! headers, and the persistent SSE stream. All chat semantics live in
//! the service crates.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::AppError;
pub use state::AppState;
