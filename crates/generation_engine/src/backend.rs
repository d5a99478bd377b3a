//! Completion backend contract and the OpenAI-compatible HTTP client
//!
//! One request, one full response. Failures surface immediately; the
//! caller decides whether to re-invoke.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use chat_core::{Message, Role};

use crate::error::GenerationError;

/// One turn of generation context on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for PromptMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Produce the full assistant text for an ordered context.
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, GenerationError>;
}

pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message { message: String },
    Plain(String),
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, GenerationError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        log::debug!(
            "completion request: model={}, context={} messages",
            self.model,
            messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| match b.error {
                    ErrorDetail::Message { message } => message,
                    ErrorDetail::Plain(message) => message,
                })
                .unwrap_or(text);
            return Err(GenerationError::Upstream(format!("HTTP {}: {}", status, detail)));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Upstream(format!("malformed response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> Vec<PromptMessage> {
        vec![PromptMessage {
            role: Role::User,
            content: "Hello".into(),
        }]
    }

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi there"}}]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("sk-test").with_base_url(server.uri());
        let text = backend.complete(&context()).await.unwrap();
        assert_eq!(text, "Hi there");
    }

    #[tokio::test]
    async fn complete_surfaces_upstream_error_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "rate limited"}
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("sk-test").with_base_url(server.uri());
        let err = backend.complete(&context()).await.unwrap_err();
        match err {
            GenerationError::Upstream(msg) => assert!(msg.contains("rate limited")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn complete_maps_missing_text_to_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": ""}}]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("sk-test").with_base_url(server.uri());
        let err = backend.complete(&context()).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn complete_maps_no_choices_to_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("sk-test").with_base_url(server.uri());
        let err = backend.complete(&context()).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[test]
    fn prompt_message_serializes_lowercase_role() {
        let msg = PromptMessage {
            role: Role::Assistant,
            content: "x".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], json!("assistant"));
    }
}
