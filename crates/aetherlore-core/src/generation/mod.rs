//! Text generation
//!
//! One prompt-composition routine and three interchangeable backends:
//!
//! - [`GeminiProvider`] - Google Gemini `generateContent`
//! - [`NovelAiProvider`] - NovelAI `/ai/generate`
//! - [`LocalProvider`] - any OpenAI-compatible `/chat/completions` server
//!
//! The active backend is chosen per call from [`AiSettings::provider`], so
//! switching providers in settings takes effect on the next request.

pub mod error;
pub mod gemini;
pub mod local;
pub mod novelai;
pub mod transport;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{AiProvider, AiSettings};

pub use error::GenerationError;
pub use gemini::GeminiProvider;
pub use local::LocalProvider;
pub use novelai::NovelAiProvider;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportFailure};

/// Instruction sent alongside every prompt
pub const SYSTEM_INSTRUCTION: &str = "You are a creative writing assistant specializing in world-building and lore creation.
Your task is to generate detailed, evocative, and consistent lore entries for a fictional world.
Focus on sensory details, historical context, and interesting hooks.
Format your output as clean text suitable for a wiki entry or RPG sourcebook.
Do not surround the output with quotes.";

/// A text generation backend
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Display name used in error messages
    fn backend(&self) -> &'static str;

    /// Send a composed prompt and return the generated text
    ///
    /// An empty completion is replaced by the backend's placeholder text,
    /// never returned as an empty string.
    async fn complete(&self, settings: &AiSettings, prompt: &str)
        -> Result<String, GenerationError>;
}

/// Build the full prompt from the user's instruction and the entry body
pub fn compose_prompt(user_prompt: &str, existing_content: &str) -> String {
    if existing_content.is_empty() {
        format!("Write a new lore entry based on: \"{}\"", user_prompt)
    } else {
        format!(
            "Continue the following lore entry based on this instruction: \"{}\"\n\n[Existing Entry Start]\n{}\n[Existing Entry End]",
            user_prompt, existing_content
        )
    }
}

/// Compose the prompt and run it through `provider`
pub async fn generate(
    provider: &dyn GenerationProvider,
    settings: &AiSettings,
    user_prompt: &str,
    existing_content: &str,
) -> Result<String, GenerationError> {
    let prompt = compose_prompt(user_prompt, existing_content);
    debug!(
        provider = provider.backend(),
        prompt_chars = prompt.chars().count(),
        "Requesting generation"
    );
    provider.complete(settings, &prompt).await
}

/// Select the backend named by `settings.provider`
pub fn provider_for(
    settings: &AiSettings,
    config: &Config,
    transport: Arc<dyn HttpTransport>,
) -> Box<dyn GenerationProvider> {
    match settings.provider {
        AiProvider::Gemini => Box::new(GeminiProvider::new(
            config.gemini_api_key.clone(),
            transport,
        )),
        AiProvider::NovelAi => Box::new(NovelAiProvider::new(transport)),
        AiProvider::Local => Box::new(LocalProvider::new(transport)),
    }
}

/// Send a request and decode a successful JSON reply
///
/// Transport failures and unreadable bodies become `Connection` errors;
/// non-2xx replies become `Status` errors carrying the reason phrase.
pub(crate) async fn post_for_json<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    backend: &'static str,
    request: HttpRequest,
) -> Result<T, GenerationError> {
    let response = send(transport, backend, request).await?;
    decode_body(backend, &response)
}

/// Send a request, failing on transport errors and non-2xx statuses
pub(crate) async fn send(
    transport: &dyn HttpTransport,
    backend: &'static str,
    request: HttpRequest,
) -> Result<HttpResponse, GenerationError> {
    let response = transport
        .post_json(request)
        .await
        .map_err(|e| GenerationError::Connection {
            backend,
            detail: e.to_string(),
        })?;

    if !response.is_success() {
        warn!(
            backend,
            status = response.status,
            body = %response.body,
            "Generation request failed"
        );
        return Err(GenerationError::Status {
            backend,
            status: response.status,
            reason: response.reason,
        });
    }
    Ok(response)
}

pub(crate) fn decode_body<T: DeserializeOwned>(
    backend: &'static str,
    response: &HttpResponse,
) -> Result<T, GenerationError> {
    serde_json::from_str(&response.body).map_err(|e| GenerationError::Connection {
        backend,
        detail: format!("unreadable response body: {}", e),
    })
}

/// Deserialize `null` the same as a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Replace an empty completion with a placeholder
pub(crate) fn or_placeholder(text: Option<String>, placeholder: &str) -> String {
    match text {
        Some(text) if !text.is_empty() => text,
        _ => placeholder.to_string(),
    }
}
