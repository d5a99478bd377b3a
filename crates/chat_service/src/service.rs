//! ConversationService orchestration
//!
//! `post_message` acknowledges synchronously and spawns the generation
//! task; the task drives the Generating → {Completed, Stopped, Failed}
//! transitions and guarantees that any non-empty emitted content is
//! persisted before it exits, whatever the terminal.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use chat_core::{ChatEvent, Conversation, Message, Principal, Role};
use conversation_manager::{ConversationTree, Store};
use generation_engine::{GenerationEngine, PromptMessage};
use session_manager::SessionRegistry;

use crate::error::ServiceError;
use crate::machine::{GenerationSignal, GenerationState};
use crate::resolve::should_show_resolve;
use crate::usage::{BillingDirectory, UsageGate};

#[derive(Debug, Clone)]
pub struct PostMessageRequest {
    pub session_key: String,
    pub principal: Principal,
    pub chat_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct RegenerateRequest {
    pub session_key: String,
    pub principal: Principal,
    pub chat_id: Uuid,
    pub message_id: Uuid,
}

/// Synchronous acknowledgment; generation continues in the background.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAck {
    pub message_id: Uuid,
    pub chat_id: Uuid,
    pub status: String,
    pub parent_id: Option<Uuid>,
    pub current_version: u32,
    pub total_versions: u32,
}

impl MessageAck {
    fn processing(msg: &Message) -> Self {
        Self {
            message_id: msg.id,
            chat_id: msg.conversation_id,
            status: "processing".to_string(),
            parent_id: msg.parent,
            current_version: msg.current_version,
            total_versions: msg.total_versions,
        }
    }
}

enum GenerationMode {
    /// Reply to a freshly appended user message; the assistant row is
    /// appended under it on completion.
    Reply { user_message: Message },
    /// Redo of an existing assistant message; content is overwritten in
    /// place on completion.
    Regenerate { message: Message },
}

struct GenerationRun {
    conversation_id: Uuid,
    session_key: String,
    principal: Principal,
    /// Announced on the wire before the row exists.
    assistant_id: Uuid,
    mode: GenerationMode,
    state: GenerationState,
}

struct Inner {
    store: Arc<dyn Store>,
    tree: ConversationTree<dyn Store>,
    engine: Arc<GenerationEngine>,
    registry: Arc<SessionRegistry>,
    usage: Arc<dyn UsageGate>,
    billing: Arc<dyn BillingDirectory>,
}

/// Cheap-to-clone handle; all generation tasks share the same inner
/// state.
#[derive(Clone)]
pub struct ChatService {
    inner: Arc<Inner>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn Store>,
        engine: Arc<GenerationEngine>,
        registry: Arc<SessionRegistry>,
        usage: Arc<dyn UsageGate>,
        billing: Arc<dyn BillingDirectory>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tree: ConversationTree::new(store.clone()),
                store,
                engine,
                registry,
                usage,
                billing,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.inner.registry
    }

    /// Validate, gate on quota, append the user node, and spawn the
    /// generation task. Returns before generation finishes.
    pub async fn post_message(&self, req: PostMessageRequest) -> Result<MessageAck, ServiceError> {
        let inner = &self.inner;

        let content = req.content.trim().to_string();
        if content.is_empty() {
            return Err(ServiceError::Validation("content is required".into()));
        }
        if req.session_key.trim().is_empty() {
            return Err(ServiceError::Validation("sessionId is required".into()));
        }
        if !inner.registry.has_session(&req.session_key) {
            return Err(ServiceError::SessionNotFound);
        }

        let decision = inner.usage.check(&req.principal).await;
        if !decision.allowed {
            inner
                .registry
                .broadcast(&req.session_key, ChatEvent::EndTokens { exhausted: true });
            return Err(ServiceError::QuotaExceeded {
                remaining: decision.remaining,
            });
        }

        let conversation = match req.chat_id {
            Some(chat_id) => inner.owned_conversation(chat_id, &req.principal).await?,
            None => {
                let conversation = Conversation::new(
                    req.principal.clone(),
                    Some(Conversation::title_from_content(&content)),
                );
                inner.store.create_conversation(&conversation).await?;
                conversation
            }
        };

        let parent = match req.parent_id {
            Some(parent_id) => {
                let parent = inner
                    .store
                    .get_message(parent_id)
                    .await?
                    .filter(|m| m.conversation_id == conversation.id)
                    .ok_or_else(|| ServiceError::NotFound("Parent message not found".into()))?;
                Some(parent.id)
            }
            None => conversation.current_node,
        };

        let user_message = inner
            .tree
            .append(conversation.id, parent, Role::User, &content)
            .await?;
        let state = GenerationState::Idle.advance(GenerationSignal::Saved);

        inner
            .registry
            .broadcast(&req.session_key, ChatEvent::user_message(&user_message));
        inner.registry.broadcast(
            &req.session_key,
            ChatEvent::LoadingStart {
                chat_id: conversation.id,
            },
        );

        let ack = MessageAck::processing(&user_message);
        let run = GenerationRun {
            conversation_id: conversation.id,
            session_key: req.session_key,
            principal: req.principal,
            assistant_id: Uuid::new_v4(),
            mode: GenerationMode::Reply { user_message },
            state,
        };

        let inner = Arc::clone(inner);
        tokio::spawn(async move { inner.run_generation(run).await });

        Ok(ack)
    }

    /// Destructive redo of an assistant message, then the same async
    /// generation flow with in-place persistence.
    pub async fn regenerate(&self, req: RegenerateRequest) -> Result<MessageAck, ServiceError> {
        let inner = &self.inner;

        if req.session_key.trim().is_empty() {
            return Err(ServiceError::Validation("sessionId is required".into()));
        }
        if !inner.registry.has_session(&req.session_key) {
            return Err(ServiceError::SessionNotFound);
        }

        let conversation = inner.owned_conversation(req.chat_id, &req.principal).await?;
        let message = inner.tree.regenerate(conversation.id, req.message_id).await?;

        inner.registry.broadcast(
            &req.session_key,
            ChatEvent::LoadingStart {
                chat_id: conversation.id,
            },
        );

        let ack = MessageAck::processing(&message);
        let run = GenerationRun {
            conversation_id: conversation.id,
            session_key: req.session_key,
            principal: req.principal,
            assistant_id: message.id,
            mode: GenerationMode::Regenerate { message },
            state: GenerationState::Idle.advance(GenerationSignal::Saved),
        };

        let inner = Arc::clone(inner);
        tokio::spawn(async move { inner.run_generation(run).await });

        Ok(ack)
    }

    /// Conversation-scoped cooperative stop. Works from any connection,
    /// or none.
    pub fn stop_streaming(&self, chat_id: Uuid) -> bool {
        self.inner.engine.stop(chat_id)
    }

    pub async fn switch_branch(
        &self,
        principal: &Principal,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<Vec<Message>, ServiceError> {
        let conversation = self.inner.owned_conversation(chat_id, principal).await?;
        Ok(self.inner.tree.switch_branch(conversation.id, message_id).await?)
    }

    /// Active branch, root-first.
    pub async fn history(
        &self,
        principal: &Principal,
        chat_id: Uuid,
    ) -> Result<Vec<Message>, ServiceError> {
        let conversation = self.inner.owned_conversation(chat_id, principal).await?;
        Ok(self.inner.tree.active_branch(conversation.id).await?)
    }

    pub async fn list_conversations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<Conversation>, ServiceError> {
        Ok(self.inner.store.list_conversations(principal).await?)
    }

    pub async fn rename(
        &self,
        principal: &Principal,
        chat_id: Uuid,
        title: &str,
    ) -> Result<Conversation, ServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::Validation("title is required".into()));
        }
        let mut conversation = self.inner.owned_conversation(chat_id, principal).await?;
        conversation.title = Some(title.to_string());
        conversation.updated_at = chrono::Utc::now();
        self.inner.store.update_conversation(&conversation).await?;
        Ok(conversation)
    }

    pub async fn delete_conversation(
        &self,
        principal: &Principal,
        chat_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let conversation = self.inner.owned_conversation(chat_id, principal).await?;
        Ok(self.inner.store.delete_conversation(conversation.id).await?)
    }
}

impl Inner {
    async fn owned_conversation(
        &self,
        chat_id: Uuid,
        principal: &Principal,
    ) -> Result<Conversation, ServiceError> {
        self.store
            .get_conversation(chat_id)
            .await?
            .filter(|c| &c.principal == principal)
            .ok_or_else(|| ServiceError::NotFound("Chat session not found".into()))
    }

    async fn run_generation(self: Arc<Self>, mut run: GenerationRun) {
        let chat_id = run.conversation_id;
        let token = self.engine.begin(chat_id);
        run.state = run.state.advance(GenerationSignal::Start);

        self.registry.broadcast(
            &run.session_key,
            ChatEvent::StartGeneration {
                chat_id,
                message_id: run.assistant_id,
            },
        );

        let context = match self.generation_context(&run).await {
            Ok(context) => context,
            Err(e) => {
                self.fail_generation(&mut run, e.to_string());
                return;
            }
        };

        let full_text = match self.engine.generate(&context).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("[{}] generation failed: {}", run.session_key, e);
                self.fail_generation(&mut run, e.to_string());
                return;
            }
        };

        self.registry
            .broadcast(&run.session_key, ChatEvent::LoadingEnd { chat_id });

        // Payload template for chunk events; the persisted row replaces
        // it in the terminal event.
        let template = match &run.mode {
            GenerationMode::Reply { user_message } => {
                let mut template = Message::new(chat_id, Role::Assistant, "", Some(user_message.id));
                template.id = run.assistant_id;
                template
            }
            GenerationMode::Regenerate { message } => message.clone(),
        };

        let registry = self.registry.clone();
        let session_key = run.session_key.clone();
        let emission = self
            .engine
            .emit_chunks(&full_text, &token, |accumulated| {
                registry.broadcast(&session_key, ChatEvent::assistant_chunk(&template, accumulated));
            })
            .await;

        // Persistence-on-exit: the emitted prefix survives both stop and
        // completion; nothing emitted is ever dropped from storage.
        let persisted = self.persist_assistant(&run, &emission.emitted).await;

        if emission.stopped {
            run.state = run.state.advance(GenerationSignal::Stop);
            self.registry.broadcast(
                &run.session_key,
                ChatEvent::StopStreaming {
                    chat_id,
                    message_id: run.assistant_id,
                },
            );
        } else {
            run.state = run.state.advance(GenerationSignal::Complete);
            self.usage.increment(&run.principal).await;
            let resolve = should_show_resolve(self.billing.standing(&run.principal));
            if let Some(message) = &persisted {
                self.registry.broadcast(
                    &run.session_key,
                    ChatEvent::assistant_complete(message, resolve),
                );
            }
            self.registry.broadcast(
                &run.session_key,
                ChatEvent::DoneGeneration {
                    message_id: run.assistant_id,
                    chat_id,
                },
            );
        }

        self.engine.finish(chat_id);
        log::info!(
            "[{}] generation for chat {} ended in {:?}",
            run.session_key,
            chat_id,
            run.state
        );
    }

    /// Context for the backend call: the branch ending at the replied-to
    /// user message, or everything before a regenerated assistant turn.
    async fn generation_context(
        &self,
        run: &GenerationRun,
    ) -> Result<Vec<PromptMessage>, ServiceError> {
        let branch = match &run.mode {
            GenerationMode::Reply { user_message } => {
                self.tree
                    .branch_for_reply_context(run.conversation_id, user_message.id)
                    .await?
            }
            GenerationMode::Regenerate { message } => match message.parent {
                Some(parent_id) => {
                    self.tree
                        .branch_for_reply_context(run.conversation_id, parent_id)
                        .await?
                }
                None => Vec::new(),
            },
        };
        Ok(branch.iter().map(PromptMessage::from).collect())
    }

    async fn persist_assistant(&self, run: &GenerationRun, text: &str) -> Option<Message> {
        match &run.mode {
            GenerationMode::Reply { user_message } => {
                if text.is_empty() {
                    return None;
                }
                match self
                    .tree
                    .append_with_id(
                        run.conversation_id,
                        Some(user_message.id),
                        Role::Assistant,
                        text,
                        run.assistant_id,
                    )
                    .await
                {
                    Ok(message) => Some(message),
                    Err(e) => {
                        log::error!(
                            "[{}] failed to persist assistant message: {}",
                            run.session_key,
                            e
                        );
                        None
                    }
                }
            }
            GenerationMode::Regenerate { message } => {
                if text.is_empty() {
                    // Stopped before the first chunk; the old content
                    // stays in place.
                    return Some(message.clone());
                }
                match self
                    .tree
                    .overwrite_content(run.conversation_id, message.id, text)
                    .await
                {
                    Ok(message) => Some(message),
                    Err(e) => {
                        log::error!(
                            "[{}] failed to overwrite regenerated message: {}",
                            run.session_key,
                            e
                        );
                        None
                    }
                }
            }
        }
    }

    fn fail_generation(&self, run: &mut GenerationRun, error: String) {
        run.state = run.state.advance(GenerationSignal::Fail);
        self.registry.broadcast(
            &run.session_key,
            ChatEvent::Error {
                error,
                message_id: Some(run.assistant_id),
                chat_id: Some(run.conversation_id),
            },
        );
        self.registry.broadcast(
            &run.session_key,
            ChatEvent::LoadingEnd {
                chat_id: run.conversation_id,
            },
        );
        self.engine.finish(run.conversation_id);
    }
}
