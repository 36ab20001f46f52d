//! NovelAI backend
//!
//! NovelAI has no separate system role, so the instruction is prepended to
//! the prompt as a bracketed `[System: ...]` block.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::transport::{HttpRequest, HttpTransport};
use super::{or_placeholder, post_for_json, GenerationError, GenerationProvider, SYSTEM_INSTRUCTION};
use crate::models::AiSettings;

const BACKEND: &str = "NovelAI";

pub const NOVELAI_ENDPOINT: &str = "https://api.novelai.net/ai/generate";

/// Model used for every request
pub const NOVELAI_MODEL: &str = "kayra-v1";

/// Returned when the model produced no text
pub const NO_CONTENT: &str = "No content returned from NovelAI.";

/// NovelAI completion client
pub struct NovelAiProvider {
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
}

impl NovelAiProvider {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoint: NOVELAI_ENDPOINT.to_string(),
            transport,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    input: String,
    model: &'a str,
    parameters: Parameters,
}

/// Sampling parameters; only temperature and length come from settings
#[derive(Serialize)]
struct Parameters {
    use_string: bool,
    temperature: f32,
    max_length: u32,
    top_p: f32,
    top_k: u32,
    tail_free_sampling: f32,
    repetition_penalty: f32,
    repetition_penalty_range: u32,
    repetition_penalty_slope: f32,
}

impl Parameters {
    fn from_settings(settings: &AiSettings) -> Self {
        Self {
            use_string: true,
            temperature: settings.temperature,
            max_length: settings.max_tokens,
            top_p: 0.9,
            top_k: 40,
            tail_free_sampling: 0.968,
            repetition_penalty: 1.18,
            repetition_penalty_range: 2048,
            repetition_penalty_slope: 0.02,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    output: Option<String>,
}

#[async_trait]
impl GenerationProvider for NovelAiProvider {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn complete(
        &self,
        settings: &AiSettings,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        let api_key = settings
            .novel_ai_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::Credential("NovelAI API Key is missing in settings.".to_string())
            })?;

        let body = GenerateRequest {
            input: format!("[System: {}]\n\n{}", SYSTEM_INSTRUCTION, prompt),
            model: NOVELAI_MODEL,
            parameters: Parameters::from_settings(settings),
        };
        let body = serde_json::to_value(&body).map_err(|e| GenerationError::Connection {
            backend: BACKEND,
            detail: e.to_string(),
        })?;

        let request = HttpRequest::post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(body);

        debug!(model = NOVELAI_MODEL, "Sending NovelAI request");
        let response: GenerateResponse =
            match post_for_json(self.transport.as_ref(), BACKEND, request).await {
                Err(GenerationError::Status { status: 401, .. }) => {
                    return Err(GenerationError::Unauthorized { backend: BACKEND })
                }
                other => other?,
            };

        Ok(or_placeholder(response.output, NO_CONTENT))
    }
}
