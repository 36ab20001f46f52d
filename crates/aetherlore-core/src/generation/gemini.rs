//! Google Gemini backend

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::transport::{HttpRequest, HttpTransport};
use super::{
    null_as_default, or_placeholder, post_for_json, GenerationError, GenerationProvider,
    SYSTEM_INSTRUCTION,
};
use crate::models::AiSettings;

const BACKEND: &str = "Gemini";

/// Default endpoint root
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Returned when the model produced no text
pub const NO_RESPONSE: &str = "No response generated.";

/// Gemini `generateContent` client
///
/// The API key comes from the application configuration, not from the
/// persisted settings record.
pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            transport,
        }
    }

    /// Point at a different endpoint root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    #[serde(deserialize_with = "null_as_default")]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    #[serde(deserialize_with = "null_as_default")]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        Some(content.parts.into_iter().filter_map(|p| p.text).collect())
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn complete(
        &self,
        settings: &AiSettings,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::Credential(
                    "Gemini API key is not configured. Set AETHERLORE_GEMINI_API_KEY or gemini_api_key in config.toml."
                        .to_string(),
                )
            })?;

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            generation_config: GenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_tokens,
            },
        };
        let body = serde_json::to_value(&body).map_err(|e| GenerationError::Connection {
            backend: BACKEND,
            detail: e.to_string(),
        })?;

        let request = HttpRequest::post(self.endpoint(&settings.gemini_model_name))
            .header("x-goog-api-key", api_key)
            .json(body);

        debug!(model = %settings.gemini_model_name, "Sending Gemini request");
        let response: GenerateResponse =
            post_for_json(self.transport.as_ref(), BACKEND, request).await?;

        Ok(or_placeholder(response.text(), NO_RESPONSE))
    }
}
