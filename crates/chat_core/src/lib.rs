//! chat_core - Core types for the chat system
//!
//! This crate provides the foundational types used across all chat-related crates:
//! - `message` - Message and Conversation entities, Role
//! - `principal` - opaque caller identity (account or anonymous fingerprint)
//! - `events` - transport event shapes and SSE frames
//! - `config` - service configuration

pub mod config;
pub mod events;
pub mod message;
pub mod principal;

// Re-export commonly used types
pub use config::ChatConfig;
pub use events::{ChatEvent, SseFrame};
pub use message::{Conversation, Message, Role};
pub use principal::Principal;
