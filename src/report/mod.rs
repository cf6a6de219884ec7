//! Printable loss reports.
//!
//! ## Two passes
//!
//! [`layout::plan`] decides where every banner, line and image goes. It is
//! pure, so pagination rules are unit-tested without a PDF engine.
//! [`pdf`] then replays that plan through pdfium on a blocking thread.
//!
//! Rendering is all-or-nothing: any failure yields a [`RenderError`] and no
//! bytes.

pub mod layout;
mod pdf;

use crate::error::RenderError;
use crate::pipeline::encode;
use crate::pipeline::validate::sanitize_filename;
use crate::record::{ReportSpec, TIMESTAMP_FORMAT};
use image::{DynamicImage, GenericImageView};
use layout::{LayoutInput, ReportLayout};
use tracing::{debug, info};

/// Renders a [`ReportSpec`] to PDF bytes.
///
/// Stateless. The pdfium library is bound lazily on the first render, so
/// constructing a renderer never touches the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `spec` with the current local time in the header.
    pub async fn render(&self, spec: &ReportSpec) -> Result<Vec<u8>, RenderError> {
        let generated_at = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.render_at(spec, &generated_at).await
    }

    /// Render `spec` with a caller-supplied header timestamp.
    pub async fn render_at(
        &self,
        spec: &ReportSpec,
        generated_at: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let renderer = *self;
        let spec = spec.clone();
        let generated_at = generated_at.to_string();

        // Decoding the photo and drawing are both CPU-bound.
        let bytes = tokio::task::spawn_blocking(move || {
            let image = decode_embedded_image(&spec)?;
            let layout = renderer.layout(&spec, &generated_at, image.as_ref());
            info!(
                "Rendering '{}' report: {} page(s), image: {}",
                spec.damage_type,
                layout.page_count(),
                image.is_some()
            );
            pdf::draw_document(&layout, image.as_ref())
        })
        .await
        .map_err(|e| RenderError::Internal(format!("Render task panicked: {}", e)))??;

        debug!("Report rendered: {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Compute the page plan without drawing.
    pub fn layout(
        &self,
        spec: &ReportSpec,
        generated_at: &str,
        image: Option<&DynamicImage>,
    ) -> ReportLayout {
        layout::plan(&LayoutInput {
            damage_type: &spec.damage_type,
            description: &spec.description,
            generated_at,
            image_size: image.map(|img| img.dimensions()),
        })
    }
}

/// Download name for a report: `loss_description_<label>.pdf`, with the
/// label reduced to file-name-safe characters.
pub fn report_filename(damage_type: &str) -> String {
    let label = sanitize_filename(damage_type);
    if label.is_empty() {
        "loss_description_report.pdf".to_string()
    } else {
        format!("loss_description_{label}.pdf")
    }
}

/// Decode the report's base64 image, if any.
///
/// A supplied payload that is not base64 or not an image fails the render;
/// an absent or blank one just omits the photo.
pub fn decode_embedded_image(spec: &ReportSpec) -> Result<Option<DynamicImage>, RenderError> {
    let Some(payload) = spec.image_payload() else {
        return Ok(None);
    };
    let bytes =
        encode::decode_payload(payload).map_err(|e| RenderError::ImageEncoding(e.to_string()))?;
    let img =
        image::load_from_memory(&bytes).map_err(|e| RenderError::ImageDecode(e.to_string()))?;
    Ok(Some(img))
}
