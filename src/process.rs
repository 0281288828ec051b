//! Request-level orchestration: PDF bytes in, [`OcrResponse`] out.
//!
//! Pages are processed strictly one after another: render all pages, then for
//! each page write its scratch image, run OCR, collect the blocks and delete
//! the image before moving on. The first error aborts the request; no partial
//! response is ever built.

use crate::error::PdfOcrError;
use crate::pipeline::assemble::OcrResponse;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::{self, Rasteriser};
use crate::pipeline::scratch;
use axum::body::Bytes;
use image::DynamicImage;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Rasterise `pdf` and OCR every page.
///
/// # Errors
/// Any rasterisation, scratch-file, OCR or serialisation failure. Scratch
/// images created before the failure are deleted before this returns.
pub async fn process_pdf(
    pdf: Bytes,
    rasteriser: &Arc<dyn Rasteriser>,
    engine: &Arc<dyn OcrEngine>,
    dpi: u32,
    temp_dir: &Path,
) -> Result<OcrResponse, PdfOcrError> {
    let total_start = Instant::now();

    let render_start = Instant::now();
    let pages = render::rasterise(rasteriser, pdf, dpi).await?;
    info!(
        "Rendered {} pages at {} DPI in {}ms",
        pages.len(),
        dpi,
        render_start.elapsed().as_millis()
    );

    let response = ocr_pages(pages, engine, temp_dir).await?;

    info!(
        "OCR complete: {} pages, {} blocks, {}ms total",
        response.page_count(),
        response.block_count(),
        total_start.elapsed().as_millis()
    );
    Ok(response)
}

/// OCR already rendered pages in order.
pub async fn ocr_pages(
    pages: Vec<DynamicImage>,
    engine: &Arc<dyn OcrEngine>,
    temp_dir: &Path,
) -> Result<OcrResponse, PdfOcrError> {
    let mut all_pages = Vec::with_capacity(pages.len());

    for (idx, image) in pages.into_iter().enumerate() {
        let page_num = idx + 1;
        all_pages.push(ocr_page(page_num, image, engine, temp_dir).await?);
    }

    Ok(OcrResponse::from_pages(all_pages))
}

/// One page: scratch image → engine → JSON blocks → delete scratch image.
async fn ocr_page(
    page_num: usize,
    image: DynamicImage,
    engine: &Arc<dyn OcrEngine>,
    temp_dir: &Path,
) -> Result<Vec<Value>, PdfOcrError> {
    let start = Instant::now();
    let scratch = scratch::write_scratch(temp_dir.to_path_buf(), image, page_num).await?;

    // On error `scratch` drops here and the file goes with it.
    let blocks = engine
        .recognize(scratch.path())
        .await
        .map_err(|source| PdfOcrError::Ocr {
            page: page_num,
            source,
        })?;

    let values = blocks
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    scratch.remove();

    debug!(
        "Page {}: {} blocks via {} in {}ms",
        page_num,
        values.len(),
        engine.name(),
        start.elapsed().as_millis()
    );
    Ok(values)
}
