//! Service configuration.
//!
//! Every knob lives in [`ServiceConfig`], built via [`ServiceConfigBuilder`].
//! The config is constructed once at process start and handed to
//! [`crate::context::AppContext::from_config`]; nothing reads the environment
//! after that point.

use crate::error::ConfigError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Placeholder damage label used when the caller supplies no category.
pub const DEFAULT_DAMAGE_LABEL: &str = "Unknown Damage";

/// Default upload limit: 16 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for ingestion, history and report rendering.
///
/// # Example
/// ```rust
/// use loss_report::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .history_path("/var/lib/loss-report/history.json")
///     .model("gpt-4.1-mini")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// JSON file holding the append-only history log.
    /// Default: `data/detection_history.json`.
    pub history_path: PathBuf,

    /// Directory for per-request staging files. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Largest accepted upload body in bytes. Default: 16 MiB.
    pub max_upload_bytes: usize,

    /// Label used when neither `custom_damage` nor `damage_type` is given.
    pub default_damage_label: String,

    /// JPEG quality (1–100) for the canonical re-encode. Default: 95.
    pub jpeg_quality: u8,

    /// LLM model identifier. If None, uses `gpt-4.1-nano` for named providers.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Captions should describe what is visible, not invent it; descriptions
    /// get a little room for phrasing.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per call. Default: 512.
    pub max_tokens: usize,

    /// Per-collaborator-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Override for the captioning system prompt.
    pub caption_prompt: Option<String>,

    /// Override for the description system prompt.
    pub description_prompt: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("data/detection_history.json"),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_damage_label: DEFAULT_DAMAGE_LABEL.to_string(),
            jpeg_quality: 95,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 512,
            api_timeout_secs: 60,
            caption_prompt: None,
            description_prompt: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("history_path", &self.history_path)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("default_damage_label", &self.default_damage_label)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.history_path = path.into();
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn default_damage_label(mut self, label: impl Into<String>) -> Self {
        self.config.default_damage_label = label.into();
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

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

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn caption_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.caption_prompt = Some(prompt.into());
        self
    }

    pub fn description_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.description_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let c = &self.config;
        if c.default_damage_label.trim().is_empty() {
            return Err(ConfigError("default damage label must not be empty".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(ConfigError("upload limit must be ≥ 1 byte".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ConfigError("API timeout must be ≥ 1 second".into()));
        }
        if c.max_tokens == 0 {
            return Err(ConfigError("max tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
