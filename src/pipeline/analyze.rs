//! Damage analysis: the captioning and description-enhancement collaborator.
//!
//! The orchestrator only knows the [`DamageAnalyzer`] trait. Production uses
//! [`VisionAnalyzer`], which drives an `edgequake-llm` provider; tests plug in
//! a fake without touching orchestration logic.
//!
//! No retries happen here. A failed call fails the ingestion and the client
//! decides whether to resubmit.

use crate::config::ServiceConfig;
use crate::error::AnalyzerError;
use crate::pipeline::{encode, postprocess};
use crate::prompts::{description_request, DEFAULT_CAPTION_PROMPT, DEFAULT_DESCRIPTION_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// The two capabilities the ingestion pipeline needs from the ML side.
#[async_trait]
pub trait DamageAnalyzer: Send + Sync {
    /// Describe what is visible in the photo.
    async fn caption(&self, image: &DynamicImage) -> Result<String, AnalyzerError>;

    /// Turn a caption plus the claimant's damage label into a loss description.
    async fn enhance(&self, caption: &str, damage_label: &str) -> Result<String, AnalyzerError>;
}

/// [`DamageAnalyzer`] backed by a vision-capable LLM.
pub struct VisionAnalyzer {
    provider: Arc<dyn LLMProvider>,
    caption_prompt: String,
    description_prompt: String,
    options: CompletionOptions,
    jpeg_quality: u8,
}

impl VisionAnalyzer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ServiceConfig) -> Self {
        Self {
            provider,
            caption_prompt: config
                .caption_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_CAPTION_PROMPT.to_string()),
            description_prompt: config
                .description_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION_PROMPT.to_string()),
            options: build_options(config),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Resolve a provider from `config` and wrap it.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, AnalyzerError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    async fn complete(
        &self,
        stage: &'static str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, AnalyzerError> {
        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| AnalyzerError::Api {
                message: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            stage,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        let text = postprocess::clean_model_text(&response.content);
        if text.is_empty() {
            return Err(AnalyzerError::EmptyResponse { stage });
        }
        Ok(text)
    }
}

#[async_trait]
impl DamageAnalyzer for VisionAnalyzer {
    async fn caption(&self, image: &DynamicImage) -> Result<String, AnalyzerError> {
        let image_data = encode::vision_image_data(image, self.jpeg_quality)
            .map_err(|e| AnalyzerError::Encoding(e.to_string()))?;

        // The photo carries all the content; the user text stays empty.
        let messages = vec![
            ChatMessage::system(self.caption_prompt.as_str()),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        self.complete("caption", messages).await
    }

    async fn enhance(&self, caption: &str, damage_label: &str) -> Result<String, AnalyzerError> {
        let messages = vec![
            ChatMessage::system(self.description_prompt.as_str()),
            ChatMessage::user(description_request(caption, damage_label)),
        ];
        self.complete("description", messages).await
    }
}

/// Build `CompletionOptions` from the service config.
fn build_options(config: &ServiceConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, AnalyzerError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AnalyzerError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &ServiceConfig) -> Result<Arc<dyn LLMProvider>, AnalyzerError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) = ProviderFactory::from_env().map_err(no_vision_model)?;
    Ok(llm_provider)
}

/// Auto-detection found nothing; tell the operator what the photo analysis needs.
fn no_vision_model(cause: impl std::fmt::Display) -> AnalyzerError {
    AnalyzerError::ProviderNotConfigured {
        provider: "auto".to_string(),
        hint: format!(
            "No vision-capable model is configured for damage photo analysis ({cause}). \
             Pass --provider and --model, or set EDGEQUAKE_LLM_PROVIDER and \
             EDGEQUAKE_MODEL (or OPENAI_API_KEY) to a model that accepts images."
        ),
    }
}
