//! Configuration types for report extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it easy to share one config between the single-document, batch and
//! title-backfill entry points.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Model used when neither the config nor `OPENAI_MODEL` names one.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for extracting structured data from report PDFs.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use ivv_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o")
///     .page_limit(Some(8))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier, e.g. "gpt-4o".
    /// If None, `OPENAI_MODEL` is consulted, then [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Output token budget for full and report-only extraction. Default: 4000.
    pub max_tokens: usize,

    /// Output token budget for project seeding. Default: 2000.
    pub project_max_tokens: usize,

    /// Output token budget for one generated issue title. Default: 20.
    pub title_max_tokens: usize,

    /// Pages rendered per document. Default: `Some(10)`; `None` renders all.
    ///
    /// The executive summary, background and dashboard sections of a report
    /// sit in its first pages.
    pub page_limit: Option<usize>,

    /// Longest rendered edge in pixels. Default: 2048.
    pub max_rendered_pixels: u32,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4000,
            project_max_tokens: 2000,
            title_max_tokens: 20,
            page_limit: Some(10),
            max_rendered_pixels: 2048,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("project_max_tokens", &self.project_max_tokens)
            .field("title_max_tokens", &self.title_max_tokens)
            .field("page_limit", &self.page_limit)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model to request: explicit setting, then `OPENAI_MODEL`, then [`DEFAULT_MODEL`].
    pub fn resolved_model(&self) -> String {
        if let Some(ref model) = self.model {
            return model.clone();
        }
        match std::env::var("OPENAI_MODEL") {
            Ok(m) if !m.is_empty() => m,
            _ => DEFAULT_MODEL.to_string(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn project_max_tokens(mut self, n: usize) -> Self {
        self.config.project_max_tokens = n;
        self
    }

    pub fn title_max_tokens(mut self, n: usize) -> Self {
        self.config.title_max_tokens = n;
        self
    }

    pub fn page_limit(mut self, limit: Option<usize>) -> Self {
        self.config.page_limit = limit;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.max_tokens == 0 || c.project_max_tokens == 0 || c.title_max_tokens == 0 {
            return Err(ExtractError::InvalidConfig(
                "Token budgets must be ≥ 1".into(),
            ));
        }
        if c.page_limit == Some(0) {
            return Err(ExtractError::InvalidConfig(
                "Page limit must be ≥ 1 (omit it to render every page)".into(),
            ));
        }
        Ok(self.config)
    }
}
