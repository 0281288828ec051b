//! PDF rasterisation: render every page of an in-memory PDF via pdfium.
//!
//! pdfium is a synchronous C++ library; a 300 DPI render of a long document
//! can hold a thread for seconds. [`rasterise`] runs the [`Rasteriser`] on
//! the blocking pool so the async workers stay free for other requests.
//! Pages are returned all at once, in document order.

use crate::error::PdfOcrError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Turns a PDF byte buffer into one image per page, in document order.
///
/// Implementations are blocking; call them through [`rasterise`].
pub trait Rasteriser: Send + Sync {
    fn rasterise(&self, pdf: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, PdfOcrError>;
}

/// Run a [`Rasteriser`] on the blocking pool.
pub async fn rasterise(
    rasteriser: &Arc<dyn Rasteriser>,
    pdf: axum::body::Bytes,
    dpi: u32,
) -> Result<Vec<DynamicImage>, PdfOcrError> {
    let rasteriser = Arc::clone(rasteriser);

    tokio::task::spawn_blocking(move || rasteriser.rasterise(&pdf, dpi))
        .await
        .map_err(|e| PdfOcrError::Internal(format!("Render task panicked: {}", e)))?
}

/// [`Rasteriser`] backed by the pdfium library.
///
/// pdfium is bound once, here, and lives as long as the rasteriser. Dropping
/// a `Pdfium` tears down the library's global state, so concurrent requests
/// share this one instance and take turns through `pdfium`'s lock for the
/// whole load → render sequence. Build one per process and share it.
pub struct PdfiumRasteriser {
    pdfium: Mutex<Pdfium>,
}

impl PdfiumRasteriser {
    /// Bind to the pdfium library at `lib_path` (file or directory), or to
    /// the system library when `None`.
    ///
    /// # Errors
    /// [`PdfOcrError::PdfiumBindingFailed`] when no library can be loaded.
    pub fn new(lib_path: Option<&Path>) -> Result<Self, PdfOcrError> {
        let pdfium = bind_pdfium(lib_path)?;
        info!("pdfium bound");
        Ok(Self {
            pdfium: Mutex::new(pdfium),
        })
    }
}

impl Rasteriser for PdfiumRasteriser {
    fn rasterise(&self, pdf: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, PdfOcrError> {
        let pdfium = self
            .pdfium
            .lock()
            .map_err(|_| PdfOcrError::Internal("pdfium lock poisoned".into()))?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(map_load_error)?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        if total_pages == 0 {
            return Err(PdfOcrError::EmptyDocument);
        }

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let mut images = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                PdfOcrError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

/// Bind to pdfium from an explicit path or the system library.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, PdfOcrError> {
    let bindings = match lib_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| PdfOcrError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn map_load_error(e: PdfiumError) -> PdfOcrError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        PdfOcrError::PasswordRequired
    } else {
        PdfOcrError::CorruptPdf { detail }
    }
}
