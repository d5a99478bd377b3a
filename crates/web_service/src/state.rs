//! Shared application state
//!
//! All registries are constructed here, once per process (or per test),
//! and injected into handlers through actix's `Data`; nothing is an
//! ambient singleton.

use std::sync::Arc;

use chat_core::ChatConfig;
use chat_service::{
    BillingDirectory, ChatService, DailyUsageGate, StaticBillingDirectory, UsageGate,
};
use conversation_manager::{MemoryStore, Store};
use generation_engine::{CompletionBackend, GenerationEngine, OpenAiBackend};
use session_manager::SessionRegistry;

pub struct AppState {
    pub service: ChatService,
    pub registry: Arc<SessionRegistry>,
    pub config: ChatConfig,
}

impl AppState {
    /// Wire the full stack around a completion backend.
    pub fn new(config: ChatConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let registry = Arc::new(SessionRegistry::new(&config));
        let billing: Arc<dyn BillingDirectory> = Arc::new(StaticBillingDirectory::new());
        let usage: Arc<dyn UsageGate> = Arc::new(DailyUsageGate::new(billing.clone(), &config));
        let engine = Arc::new(GenerationEngine::new(
            backend,
            config.chunk_size,
            config.chunk_delay(),
        ));

        let service = ChatService::new(store, engine, registry.clone(), usage, billing);

        Self {
            service,
            registry,
            config,
        }
    }

    /// Production wiring: OpenAI-compatible HTTP backend.
    pub fn with_openai_backend(
        config: ChatConfig,
        api_key: String,
        base_url: String,
        model: String,
    ) -> Self {
        let backend = Arc::new(
            OpenAiBackend::new(api_key)
                .with_base_url(base_url)
                .with_model(model),
        );
        Self::new(config, backend)
    }
}
