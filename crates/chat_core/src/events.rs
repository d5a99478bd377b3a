//! Transport event shapes
//!
//! Every event a delivery session can fan out to connected clients,
//! serialized at the transport boundary as tagged JSON. Progressive
//! `assistantChunk` events carry the ENTIRE accumulated content so far,
//! never a delta, so a client joining mid-stream renders correctly from
//! any single event.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Message, Role};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChatEvent {
    /// First event on every new connection, echoing the session key.
    Connected { session_key: String },

    /// Echo of a persisted user message, with its branch bookkeeping.
    UserMessage {
        message_id: Uuid,
        chat_id: Uuid,
        role: Role,
        content: String,
        parent_id: Option<Uuid>,
        current_version: u32,
        total_versions: u32,
    },

    StartGeneration { chat_id: Uuid, message_id: Uuid },

    LoadingStart { chat_id: Uuid },

    LoadingEnd { chat_id: Uuid },

    /// Progressive assistant output; `content` is accumulated-so-far.
    AssistantChunk {
        message_id: Uuid,
        chat_id: Uuid,
        role: Role,
        content: String,
        parent_id: Option<Uuid>,
        current_version: u32,
        total_versions: u32,
        resolve_message: bool,
    },

    /// Terminal event of a stopped generation.
    StopStreaming { chat_id: Uuid, message_id: Uuid },

    /// Terminal payload of a completed generation.
    AssistantComplete {
        message_id: Uuid,
        chat_id: Uuid,
        role: Role,
        content: String,
        parent_id: Option<Uuid>,
        current_version: u32,
        total_versions: u32,
        resolve_message: bool,
    },

    DoneGeneration { message_id: Uuid, chat_id: Uuid },

    /// Daily quota notice.
    EndTokens { exhausted: bool },

    /// Liveness probe; the client answers through the pong side channel.
    Ping { timestamp: i64 },

    Error {
        error: String,
        message_id: Option<Uuid>,
        chat_id: Option<Uuid>,
    },
}

impl ChatEvent {
    pub fn user_message(msg: &Message) -> Self {
        ChatEvent::UserMessage {
            message_id: msg.id,
            chat_id: msg.conversation_id,
            role: msg.role,
            content: msg.content.clone(),
            parent_id: msg.parent,
            current_version: msg.current_version,
            total_versions: msg.total_versions,
        }
    }

    pub fn assistant_chunk(msg: &Message, accumulated: impl Into<String>) -> Self {
        ChatEvent::AssistantChunk {
            message_id: msg.id,
            chat_id: msg.conversation_id,
            role: Role::Assistant,
            content: accumulated.into(),
            parent_id: msg.parent,
            current_version: msg.current_version,
            total_versions: msg.total_versions,
            resolve_message: false,
        }
    }

    pub fn assistant_complete(msg: &Message, resolve_message: bool) -> Self {
        ChatEvent::AssistantComplete {
            message_id: msg.id,
            chat_id: msg.conversation_id,
            role: Role::Assistant,
            content: msg.content.clone(),
            parent_id: msg.parent,
            current_version: msg.current_version,
            total_versions: msg.total_versions,
            resolve_message,
        }
    }

    /// Whether this event ends a generation on the wire.
    pub fn is_generation_terminal(&self) -> bool {
        matches!(
            self,
            ChatEvent::StopStreaming { .. }
                | ChatEvent::DoneGeneration { .. }
                | ChatEvent::Error { .. }
        )
    }
}

/// One frame of a server-sent-event stream, as produced by a
/// connection's delivery loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    Event(ChatEvent),
    /// Emitted when the queue wait times out; keeps intermediaries from
    /// closing an idle transport.
    Keepalive,
    /// Stream is over; the encoder appends the `[DONE]` marker.
    Done,
}

impl SseFrame {
    /// Wire encoding. Keepalive is a raw SSE comment, not data.
    pub fn to_sse_string(&self) -> String {
        match self {
            SseFrame::Event(event) => {
                let json = serde_json::to_string(event)
                    .unwrap_or_else(|_| "{\"type\":\"error\",\"error\":\"serialization\"}".into());
                format!("data: {}\n\n", json)
            }
            SseFrame::Keepalive => ": keepalive\n\n".to_string(),
            SseFrame::Done => "data: [DONE]\n\n".to_string(),
        }
    }
}
