//! Command-line plumbing shared by the `loss-report` and `bootstrap`
//! binaries: service flags with `LOSS_REPORT_*` environment fallbacks, and
//! tracing setup.

use crate::config::{ServiceConfig, DEFAULT_DAMAGE_LABEL};
use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Flags that map onto [`ServiceConfig`].
#[derive(clap::Args, Debug, Clone)]
pub struct ServiceArgs {
    /// JSON history log.
    #[arg(long, env = "LOSS_REPORT_HISTORY", default_value = "data/detection_history.json")]
    pub history: PathBuf,

    /// Directory for staged uploads.
    #[arg(long, env = "LOSS_REPORT_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Maximum upload size in MiB.
    #[arg(long, env = "LOSS_REPORT_MAX_UPLOAD_MB", default_value_t = 16)]
    pub max_upload_mb: usize,

    /// Damage label used when the client supplies none.
    #[arg(long, env = "LOSS_REPORT_DEFAULT_LABEL", default_value = DEFAULT_DAMAGE_LABEL)]
    pub default_label: String,

    /// JPEG quality for stored images (1–100).
    #[arg(long, env = "LOSS_REPORT_JPEG_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: u8,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    pub model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    pub provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "LOSS_REPORT_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "LOSS_REPORT_MAX_TOKENS", default_value_t = 512)]
    pub max_tokens: usize,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "LOSS_REPORT_API_TIMEOUT", default_value_t = 60)]
    pub api_timeout: u64,

    /// Text file with a custom captioning system prompt.
    #[arg(long, env = "LOSS_REPORT_CAPTION_PROMPT")]
    pub caption_prompt: Option<PathBuf>,

    /// Text file with a custom description system prompt.
    #[arg(long, env = "LOSS_REPORT_DESCRIPTION_PROMPT")]
    pub description_prompt: Option<PathBuf>,
}

impl ServiceArgs {
    /// Map flags to a validated [`ServiceConfig`].
    pub async fn build_config(&self) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder()
            .history_path(&self.history)
            .upload_dir(&self.upload_dir)
            .max_upload_bytes(self.max_upload_mb.saturating_mul(1024 * 1024))
            .default_damage_label(&self.default_label)
            .jpeg_quality(self.jpeg_quality)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .api_timeout_secs(self.api_timeout);

        if let Some(ref model) = self.model {
            builder = builder.model(model);
        }
        if let Some(ref provider) = self.provider {
            builder = builder.provider_name(provider);
        }
        if let Some(ref path) = self.caption_prompt {
            builder = builder.caption_prompt(read_prompt(path).await?);
        }
        if let Some(ref path) = self.description_prompt {
            builder = builder.description_prompt(read_prompt(path).await?);
        }

        builder.build().context("Invalid configuration")
    }
}

async fn read_prompt(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}

/// Install the stderr `tracing` subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();
}
