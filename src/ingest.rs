//! Ingestion orchestration: one upload in, one persisted [`ResultRecord`] out.
//!
//! ## Sequence
//!
//! ```text
//! validate + decode ─▶ caption ─▶ enhance ─▶ re-encode ─▶ append ─▶ record
//!   (blocking pool)    (timeout)  (timeout)  (blocking)   (history)
//! ```
//!
//! Each step runs only if the previous one succeeded. The analyzer is never
//! called for a rejected upload, and nothing reaches the history log unless
//! both analyzer calls returned text. The staged copy of the upload lives in a
//! [`ValidatedUpload`] and is deleted when that value drops, whichever way
//! this function returns.

use crate::config::ServiceConfig;
use crate::error::{AnalyzerError, IngestError, ValidationError};
use crate::history::HistoryStore;
use crate::pipeline::analyze::DamageAnalyzer;
use crate::pipeline::encode;
use crate::pipeline::validate::{UploadValidator, UploadedFile, ValidatedUpload};
use crate::record::{ResultRecord, TIMESTAMP_FORMAT};
use image::{DynamicImage, ImageReader};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// One upload request as the HTTP and CLI surfaces hand it over.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub file: Option<UploadedFile>,
    /// The client's damage category, e.g. "Water Damage".
    pub damage_type: Option<String>,
    /// Free-text category that overrides `damage_type` when non-blank.
    pub custom_damage: Option<String>,
}

impl IngestRequest {
    pub fn new(file: UploadedFile) -> Self {
        Self {
            file: Some(file),
            ..Default::default()
        }
    }

    pub fn with_damage_type(mut self, label: impl Into<String>) -> Self {
        self.damage_type = Some(label.into());
        self
    }

    pub fn with_custom_damage(mut self, label: impl Into<String>) -> Self {
        self.custom_damage = Some(label.into());
        self
    }
}

/// Pick the label stored on the record: a non-blank custom label, else a
/// non-blank hint, else `default`.
pub fn resolve_damage_label(custom: Option<&str>, hint: Option<&str>, default: &str) -> String {
    custom
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| hint.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or(default)
        .to_string()
}

/// Drives an upload through validation, analysis and persistence.
pub struct IngestionOrchestrator {
    analyzer: Arc<dyn DamageAnalyzer>,
    history: Arc<HistoryStore>,
    validator: UploadValidator,
    default_label: String,
    jpeg_quality: u8,
    timeout: Duration,
}

impl IngestionOrchestrator {
    pub fn new(
        config: &ServiceConfig,
        analyzer: Arc<dyn DamageAnalyzer>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            analyzer,
            history,
            validator: UploadValidator::new(&config.upload_dir),
            default_label: config.default_damage_label.clone(),
            jpeg_quality: config.jpeg_quality,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Process one upload end to end.
    ///
    /// On success the returned record is identical to the one just appended
    /// to the history log.
    pub async fn ingest(&self, request: IngestRequest) -> Result<ResultRecord, IngestError> {
        let start = Instant::now();
        let damage_type = resolve_damage_label(
            request.custom_damage.as_deref(),
            request.damage_type.as_deref(),
            &self.default_label,
        );

        let (upload, image) = self.admit(request.file).await.inspect_err(|e| {
            warn!("Upload rejected: {}", e);
        })?;
        info!(
            "Ingesting '{}' ({}x{}) as '{}'",
            upload.filename, upload.width, upload.height, damage_type
        );

        let image_caption = self.call("caption", self.analyzer.caption(&image)).await?;
        let loss_description = self
            .call(
                "description",
                self.analyzer.enhance(&image_caption, &damage_type),
            )
            .await?;

        let quality = self.jpeg_quality;
        let jpeg = tokio::task::spawn_blocking(move || encode::encode_canonical(&image, quality))
            .await
            .map_err(|e| IngestError::Internal(format!("Encode task panicked: {}", e)))?
            .map_err(|e| IngestError::Internal(format!("JPEG re-encode failed: {}", e)))?;

        let record = ResultRecord {
            success: true,
            filename: upload.filename.clone(),
            damage_type,
            image_caption,
            loss_description,
            image_data: encode::to_base64(&jpeg),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        };

        if let Err(e) = self.history.append_record(&record).await {
            error!(
                "Analysis of '{}' succeeded but the result was not saved: {}",
                record.filename, e
            );
            return Err(e.into());
        }

        drop(upload);
        info!(
            "Ingested '{}' in {:.1}s",
            record.filename,
            start.elapsed().as_secs_f64()
        );
        Ok(record)
    }

    /// Validate, stage and fully decode the upload on the blocking pool.
    async fn admit(
        &self,
        file: Option<UploadedFile>,
    ) -> Result<(ValidatedUpload, DynamicImage), IngestError> {
        let validator = self.validator.clone();
        tokio::task::spawn_blocking(move || {
            let upload = validator.validate(file.as_ref())?;
            let image = decode_staged(&upload)?;
            Ok::<_, IngestError>((upload, image))
        })
        .await
        .map_err(|e| IngestError::Internal(format!("Validation task panicked: {}", e)))?
    }

    /// Await one analyzer call under the configured timeout.
    async fn call<T>(
        &self,
        stage: &'static str,
        fut: impl Future<Output = Result<T, AnalyzerError>>,
    ) -> Result<T, IngestError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                warn!("Analyzer {} failed: {}", stage, source);
                Err(IngestError::Processing { stage, source })
            }
            Err(_) => {
                warn!("Analyzer {} timed out after {:?}", stage, self.timeout);
                Err(IngestError::Timeout {
                    stage,
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

/// Full pixel decode. A header that probes fine can still hide a truncated
/// body, which counts as a corrupted image.
fn decode_staged(upload: &ValidatedUpload) -> Result<DynamicImage, ValidationError> {
    let corrupted = |detail: String| ValidationError::CorruptedImage { detail };
    let mut reader = ImageReader::open(upload.path()).map_err(|e| corrupted(e.to_string()))?;
    reader.set_format(upload.format);
    reader.decode().map_err(|e| corrupted(e.to_string()))
}
