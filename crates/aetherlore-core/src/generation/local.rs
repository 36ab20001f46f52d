//! OpenAI-compatible local backend (KoboldCPP, LM Studio, Ollama, ...)

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::transport::{HttpRequest, HttpTransport};
use super::{
    decode_body, null_as_default, or_placeholder, send, GenerationError, GenerationProvider,
    SYSTEM_INSTRUCTION,
};
use crate::models::AiSettings;

const BACKEND: &str = "Local AI";

/// Returned when the server produced no text
pub const NO_CONTENT: &str = "No content returned from local AI.";

/// Chat completions client for a user-run server
pub struct LocalProvider {
    transport: Arc<dyn HttpTransport>,
}

impl LocalProvider {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

/// `<base>/chat/completions` with any trailing slash on `base` removed
pub fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChatResponse {
    #[serde(deserialize_with = "null_as_default")]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl GenerationProvider for LocalProvider {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn complete(
        &self,
        settings: &AiSettings,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        let url = completions_url(&settings.local_base_url);
        let body = ChatRequest {
            model: &settings.local_model_name,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            stream: false,
        };
        let body = serde_json::to_value(&body).map_err(|e| GenerationError::Connection {
            backend: BACKEND,
            detail: e.to_string(),
        })?;

        debug!(url = %url, model = %settings.local_model_name, "Sending local request");
        let request = HttpRequest::post(&url).json(body);
        let response = match send(self.transport.as_ref(), BACKEND, request).await {
            Err(GenerationError::Connection { detail, .. }) => {
                return Err(GenerationError::Connection {
                    backend: BACKEND,
                    detail: format!(
                        "{}. Ensure KoboldCPP/LM Studio is running at {}",
                        detail, settings.local_base_url
                    ),
                })
            }
            other => other?,
        };
        let response: ChatResponse = decode_body(BACKEND, &response)?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);
        Ok(or_placeholder(text, NO_CONTENT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::transport::mock::MockTransport;
    use crate::models::AiProvider;
    use serde_json::json;

    fn local_settings() -> AiSettings {
        AiSettings {
            provider: AiProvider::Local,
            ..AiSettings::default()
        }
    }

    #[test]
    fn test_completions_url_trims_slash() {
        assert_eq!(
            completions_url("http://localhost:5001/v1/"),
            "http://localhost:5001/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:5001/v1"),
            "http://localhost:5001/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mock = Arc::new(MockTransport::new().respond(
            200,
            json!({"choices": [{"message": {"role": "assistant", "content": "Fog rolls in."}}]}),
        ));
        let provider = LocalProvider::new(mock.clone());

        let text = provider.complete(&local_settings(), "Weather").await.unwrap();
        assert_eq!(text, "Fog rolls in.");

        let request = &mock.requests()[0];
        assert_eq!(request.url, "http://localhost:5001/v1/chat/completions");
        assert!(request.header_value("Authorization").is_none());
        assert_eq!(request.body["model"], "model");
        assert_eq!(request.body["messages"][0]["role"], "system");
        assert_eq!(request.body["messages"][0]["content"], SYSTEM_INSTRUCTION);
        assert_eq!(request.body["messages"][1]["role"], "user");
        assert_eq!(request.body["messages"][1]["content"], "Weather");
        assert_eq!(request.body["max_tokens"], 500);
        assert_eq!(request.body["stream"], false);
    }

    #[tokio::test]
    async fn test_no_choices_uses_placeholder() {
        let mock = Arc::new(MockTransport::new().respond(200, json!({"choices": []})));
        let provider = LocalProvider::new(mock);

        let text = provider.complete(&local_settings(), "x").await.unwrap();
        assert_eq!(text, NO_CONTENT);
    }

    #[tokio::test]
    async fn test_null_fields_use_placeholder() {
        for body in [json!({"choices": null}), json!({"choices": [{"message": null}]})] {
            let mock = Arc::new(MockTransport::new().respond(200, body));
            let provider = LocalProvider::new(mock);

            let text = provider.complete(&local_settings(), "x").await.unwrap();
            assert_eq!(text, NO_CONTENT);
        }
    }

    #[tokio::test]
    async fn test_unreadable_body_has_no_server_hint() {
        let mock = Arc::new(MockTransport::new().respond_raw(200, "<html>"));
        let provider = LocalProvider::new(mock);

        let err = provider.complete(&local_settings(), "x").await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("unreadable response body"));
        assert!(!err.to_string().contains("KoboldCPP"));
    }

    #[tokio::test]
    async fn test_connection_failure_mentions_server() {
        let mock = Arc::new(MockTransport::new().fail("connection refused"));
        let provider = LocalProvider::new(mock);

        let err = provider.complete(&local_settings(), "x").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("connection refused"));
        assert!(message.contains("KoboldCPP/LM Studio"));
        assert!(message.contains("http://localhost:5001/v1"));
    }

    #[tokio::test]
    async fn test_status_error() {
        let mock = Arc::new(MockTransport::new().respond_raw(404, "not found"));
        let provider = LocalProvider::new(mock);

        let err = provider.complete(&local_settings(), "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Local AI API returned 404: Not Found");
    }
}
