//! # loss-report
//!
//! Turn a photo of property damage into a written loss description and a
//! printable PDF report.
//!
//! ## Why this crate?
//!
//! Claims adjusters describe the same dents, water stains and scorch marks
//! over and over. This crate asks a vision-capable LLM to caption the photo,
//! expands that caption into a loss description for the claimed damage
//! category, keeps every result in an append-only history, and renders any
//! result (or a hand-edited version of it) as a one-click PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Validate  extension allow-list, header probe, staged temp file
//!  ├─ 2. Caption   vision LLM describes the photo
//!  ├─ 3. Enhance   caption + damage label → loss description
//!  ├─ 4. Encode    canonical JPEG re-encode, base64
//!  └─ 5. Persist   append to the JSON history log
//!
//! ReportSpec ──▶ layout plan ──▶ pdfium drawing ──▶ PDF bytes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loss_report::{AppContext, IngestRequest, ServiceConfig, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let ctx = AppContext::from_config(ServiceConfig::default()).await?;
//!
//!     let bytes = std::fs::read("kitchen.jpg")?;
//!     let request = IngestRequest::new(UploadedFile::new("kitchen.jpg", bytes))
//!         .with_damage_type("Water Damage");
//!     let record = ctx.orchestrator.ingest(request).await?;
//!
//!     let pdf = ctx.renderer.render(&record.to_report_spec()).await?;
//!     std::fs::write("report.pdf", pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `loss-report` binary (clap + anyhow + tracing-subscriber) |
//! | `lambda` | on      | Enables [`http`] and the `bootstrap` Lambda binary (lambda_http + multer) |

// ── Modules ──────────────────────────────────────────────────────────────

#[cfg(any(feature = "cli", feature = "lambda"))]
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
#[cfg(feature = "lambda")]
pub mod http;
pub mod ingest;
pub mod pipeline;
pub mod prompts;
pub mod record;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use context::AppContext;
pub use error::{
    AnalyzerError, ConfigError, HistoryError, IngestError, RenderError, StartupError,
    ValidationError,
};
pub use history::HistoryStore;
pub use ingest::{IngestRequest, IngestionOrchestrator};
pub use pipeline::analyze::{DamageAnalyzer, VisionAnalyzer};
pub use pipeline::validate::{UploadValidator, UploadedFile, ValidatedUpload};
pub use record::{ReportSpec, ResultRecord};
pub use report::ReportRenderer;
