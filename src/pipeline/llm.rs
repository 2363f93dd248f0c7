//! Extraction client: one instruction prompt plus page images in, raw text out.
//!
//! [`ExtractionClient`] is the seam between the pipeline and whatever model
//! reads the pages. [`VisionClient`] implements it over any
//! `edgequake_llm::LLMProvider`, so OpenAI, Anthropic, Gemini or a local
//! OpenAI-compatible server can be used without code changes.
//!
//! There is no retry here: one failed call is surfaced immediately and the
//! caller decides whether to skip the document or stop.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, ExtractError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Submits a prompt with an ordered list of page images and returns the
/// model's reply, unparsed.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    async fn submit(
        &self,
        prompt: &str,
        images: &[ImageData],
        max_tokens: usize,
        temperature: f32,
    ) -> Result<String, DocumentError>;
}

/// [`ExtractionClient`] backed by an `edgequake_llm` provider.
#[derive(Clone)]
pub struct VisionClient {
    provider: Arc<dyn LLMProvider>,
}

impl VisionClient {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Resolve the provider described by `config` (see [`resolve_provider`]).
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        resolve_provider(config).map(Self::new)
    }
}

#[async_trait]
impl ExtractionClient for VisionClient {
    /// Send a single user message: the instruction text followed by every
    /// page image in document order. Without images the message is text-only.
    async fn submit(
        &self,
        prompt: &str,
        images: &[ImageData],
        max_tokens: usize,
        temperature: f32,
    ) -> Result<String, DocumentError> {
        let start = Instant::now();
        let message = if images.is_empty() {
            ChatMessage::user(prompt)
        } else {
            ChatMessage::user_with_images(prompt, images.to_vec())
        };
        let messages = vec![message];
        let options = build_options(max_tokens, temperature);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| DocumentError::from_provider_message(format!("{}", e)))?;

        debug!(
            "{} images: {} input tokens, {} output tokens, {:?}",
            images.len(),
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content)
    }
}

/// Build `CompletionOptions` for one request.
fn build_options(max_tokens: usize, temperature: f32) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with the resolved model.
/// 3. **`IVV_LLM_PROVIDER`** set in the environment, with the resolved model.
/// 4. **`OPENAI_API_KEY`** present: OpenAI with the resolved model.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.resolved_model();

    if let Some(ref name) = config.provider_name {
        return create_provider(name, &model);
    }

    if let Ok(name) = std::env::var("IVV_LLM_PROVIDER") {
        if !name.is_empty() {
            return create_provider(&name, &model);
        }
    }

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            return create_provider("openai", &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY (and optionally OPENAI_MODEL), or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
