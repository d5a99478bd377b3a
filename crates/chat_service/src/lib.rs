//! chat_service - the conversation orchestrator
//!
//! Glues the tree, the generation engine, and the delivery sessions
//! together: validates requests, gates them on quota, mutates the tree,
//! spawns one generation task per in-flight completion, and multicasts
//! the resulting events to every connection of the caller's session.

pub mod error;
pub mod machine;
pub mod resolve;
pub mod service;
pub mod usage;

pub use error::ServiceError;
pub use machine::{GenerationSignal, GenerationState};
pub use resolve::should_show_resolve;
pub use service::{ChatService, MessageAck, PostMessageRequest, RegenerateRequest};
pub use usage::{
    AccountStanding, BillingDirectory, DailyUsageGate, StaticBillingDirectory, UsageDecision,
    UsageGate,
};
