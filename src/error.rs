//! Error types for the loss-report library.
//!
//! Each failure family gets its own enum so callers can match on exactly the
//! conditions they can act on:
//!
//! * [`ValidationError`]: the upload itself is unacceptable. The client can
//!   fix it by sending a different file; mapped to HTTP 400 (or 413).
//! * [`IngestError`]: anything that stops an upload from becoming a persisted
//!   [`crate::record::ResultRecord`]. Wraps validation failures plus
//!   collaborator, timeout and persistence failures.
//! * [`HistoryError`]: the history log could not be written. Reads never
//!   fail; see [`crate::history::HistoryStore::read_all`].
//! * [`RenderError`]: the PDF report could not be produced. No partial
//!   document is ever returned.
//!
//! `Display` output is meant for logs. What the HTTP client sees comes from
//! `public_message()`, which never leaks paths or provider details.

use std::path::PathBuf;
use thiserror::Error;

/// Rejection reasons for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request carried no `file` part.
    #[error("No file uploaded")]
    MissingFile,

    /// A file part was present but its name was empty.
    #[error("Empty file selection")]
    EmptyFilename,

    /// The extension is not one of png, jpg, jpeg, gif.
    #[error("Unsupported file format")]
    UnsupportedFormat { filename: String },

    /// The bytes do not form a readable image of a supported raster format.
    #[error("Invalid or corrupted image")]
    CorruptedImage { detail: String },

    /// The request body exceeded the configured upload limit.
    #[error("Upload too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    /// The request could not be parsed as multipart form data.
    #[error("Malformed upload request: {0}")]
    MalformedRequest(String),
}

impl ValidationError {
    /// HTTP status code for this rejection.
    pub fn status(&self) -> u16 {
        match self {
            ValidationError::TooLarge { .. } => 413,
            _ => 400,
        }
    }

    /// Message safe to return to the client.
    pub fn public_message(&self) -> String {
        match self {
            ValidationError::TooLarge { limit, .. } => {
                format!("File too large (limit {} MB)", limit / (1024 * 1024))
            }
            ValidationError::MalformedRequest(_) => "Malformed upload request".to_string(),
            other => other.to_string(),
        }
    }
}

/// Failures from the damage-analysis collaborator.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The provider could not be constructed (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider call returned an error.
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// The provider answered with nothing usable.
    #[error("LLM returned an empty {stage}")]
    EmptyResponse { stage: &'static str },

    /// The image could not be prepared for the provider.
    #[error("Image encoding failed: {0}")]
    Encoding(String),
}

/// Failures writing the history log.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialise history: {0}")]
    Serialise(#[from] serde_json::Error),
}

/// Everything that can stop an upload from becoming a persisted record.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Captioning or description enhancement failed.
    #[error("Processing failed during {stage}: {source}")]
    Processing {
        stage: &'static str,
        #[source]
        source: AnalyzerError,
    },

    /// A collaborator call did not finish within the configured timeout.
    #[error("Processing timed out after {secs}s during {stage}")]
    Timeout { stage: &'static str, secs: u64 },

    /// The record was built but could not be durably appended.
    #[error("Failed to persist result: {0}")]
    Persistence(#[from] HistoryError),

    /// Staging, re-encoding or a panicked task.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// HTTP status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            IngestError::Validation(v) => v.status(),
            _ => 500,
        }
    }

    /// Message safe to return to the client.
    pub fn public_message(&self) -> String {
        match self {
            IngestError::Validation(v) => v.public_message(),
            IngestError::Processing { .. } => "Server error: image analysis failed".to_string(),
            IngestError::Timeout { .. } => "Server error: image analysis timed out".to_string(),
            IngestError::Persistence(_) => "Server error: result could not be saved".to_string(),
            IngestError::Internal(_) => "Server error".to_string(),
        }
    }
}

/// Failures producing a PDF report.
#[derive(Debug, Error)]
pub enum RenderError {
    /// `image_data` was not valid base64.
    #[error("Embedded image is not valid base64: {0}")]
    ImageEncoding(String),

    /// `image_data` decoded but is not a readable image.
    #[error("Embedded image could not be decoded: {0}")]
    ImageDecode(String),

    /// The pdfium library could not be loaded.
    #[error("PDF engine unavailable: {0}")]
    EngineUnavailable(String),

    /// pdfium rejected a drawing or save operation.
    #[error("PDF drawing failed while {stage}: {detail}")]
    Drawing { stage: &'static str, detail: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RenderError {
    /// Message safe to return to the client.
    pub fn public_message(&self) -> &'static str {
        "PDF generation failed"
    }
}

/// The service could not be assembled at start-up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error("Cannot open history store: {0}")]
    History(#[from] HistoryError),
}

/// Invalid [`crate::config::ServiceConfig`].
#[derive(Debug, Error)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_match_wire_contract() {
        assert_eq!(ValidationError::MissingFile.to_string(), "No file uploaded");
        assert_eq!(ValidationError::EmptyFilename.to_string(), "Empty file selection");
        assert_eq!(
            ValidationError::UnsupportedFormat {
                filename: "a.bmp".into()
            }
            .to_string(),
            "Unsupported file format"
        );
        assert_eq!(
            ValidationError::CorruptedImage {
                detail: "bad header".into()
            }
            .public_message(),
            "Invalid or corrupted image"
        );
    }

    #[test]
    fn too_large_maps_to_413() {
        let e = ValidationError::TooLarge {
            size: 20 * 1024 * 1024,
            limit: 16 * 1024 * 1024,
        };
        assert_eq!(e.status(), 413);
        assert!(e.public_message().contains("16 MB"), "got: {}", e.public_message());
    }

    #[test]
    fn processing_errors_are_500_and_opaque() {
        let e = IngestError::Processing {
            stage: "caption",
            source: AnalyzerError::Api {
                message: "invalid key sk-123".into(),
            },
        };
        assert_eq!(e.status(), 500);
        assert!(!e.public_message().contains("sk-123"));
        assert!(e.to_string().contains("caption"));
    }

    #[test]
    fn timeout_display() {
        let e = IngestError::Timeout {
            stage: "enhance",
            secs: 60,
        };
        assert!(e.to_string().contains("60s"));
        assert!(e.to_string().contains("enhance"));
        assert_eq!(e.status(), 500);
    }

    #[test]
    fn validation_inside_ingest_keeps_status() {
        let e: IngestError = ValidationError::EmptyFilename.into();
        assert_eq!(e.status(), 400);
        assert_eq!(e.public_message(), "Empty file selection");
    }
}
