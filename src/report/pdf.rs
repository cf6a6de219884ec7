//! Replay a [`ReportLayout`] onto a pdfium document.
//!
//! Everything here is blocking and must run inside `spawn_blocking`.

use super::layout::{DrawOp, Font, ReportLayout, Rgb, TextRun};
use crate::error::RenderError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

/// Bind pdfium for one render, fetching the library on first use.
fn bind() -> Result<Pdfium, RenderError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| RenderError::EngineUnavailable(e.to_string()))
}

fn drawing(stage: &'static str) -> impl Fn(PdfiumError) -> RenderError {
    move |e| RenderError::Drawing {
        stage,
        detail: format!("{:?}", e),
    }
}

fn color(c: Rgb) -> PdfColor {
    PdfColor::new(c.0, c.1, c.2, 255)
}

/// Draw `layout` into a fresh document and serialise it.
pub(crate) fn draw_document(
    layout: &ReportLayout,
    image: Option<&DynamicImage>,
) -> Result<Vec<u8>, RenderError> {
    let pdfium = bind()?;
    let mut document = pdfium
        .create_new_pdf()
        .map_err(drawing("creating document"))?;

    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();
    let font_token = |font: Font| match font {
        Font::Helvetica => regular,
        Font::HelveticaBold => bold,
    };

    for (index, plan) in layout.pages.iter().enumerate() {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(drawing("adding page"))?;

        for op in &plan.ops {
            match op {
                DrawOp::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color: fill,
                } => {
                    page.objects_mut()
                        .create_path_object_rect(
                            PdfRect::new_from_values(*y, *x, y + height, x + width),
                            None,
                            None,
                            Some(color(*fill)),
                        )
                        .map_err(drawing("drawing banner"))?;
                }
                DrawOp::Text(TextRun {
                    x,
                    y,
                    text,
                    font,
                    size,
                    color: fill,
                }) => {
                    let mut object = page
                        .objects_mut()
                        .create_text_object(
                            PdfPoints::new(*x),
                            PdfPoints::new(*y),
                            text,
                            font_token(*font),
                            PdfPoints::new(*size),
                        )
                        .map_err(drawing("drawing text"))?;
                    object
                        .set_fill_color(color(*fill))
                        .map_err(drawing("colouring text"))?;
                }
                DrawOp::Image {
                    x,
                    y,
                    width,
                    height,
                } => {
                    // The planner only emits an image op when one was supplied.
                    let Some(img) = image else {
                        continue;
                    };
                    page.objects_mut()
                        .create_image_object(
                            PdfPoints::new(*x),
                            PdfPoints::new(*y),
                            img,
                            Some(PdfPoints::new(*width)),
                            Some(PdfPoints::new(*height)),
                        )
                        .map_err(drawing("embedding image"))?;
                }
            }
        }
        debug!("Drew report page {} ({} ops)", index + 1, plan.ops.len());
    }

    document
        .save_to_bytes()
        .map_err(drawing("serialising document"))
}
