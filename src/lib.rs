//! # pdf-ocr-server
//!
//! A single-endpoint HTTP service: upload a PDF, get back the OCR text blocks
//! of every page as JSON.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /upload-pdf/
//!  │
//!  ├─ 1. Upload    multipart `file` field, `.pdf` suffix check
//!  ├─ 2. Render    rasterise pages via pdfium (spawn_blocking, 300 DPI)
//!  ├─ 3. Scratch   each page → temp_<id>.png, removed on every exit path
//!  ├─ 4. OCR       tesseract TSV → text blocks, one page at a time
//!  └─ 5. Assemble  {"results": [{"page_1": [...]}, ...]}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_ocr_server::{router, AppState, PdfiumRasteriser, ServerConfig, TesseractEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let rasteriser = Arc::new(PdfiumRasteriser::new(config.pdfium_lib_path.as_deref())?);
//!     let engine = Arc::new(TesseractEngine::new(config.tesseract.clone(), config.dpi));
//!     let bind = config.bind;
//!
//!     let app = router(AppState::new(config, rasteriser, engine));
//!     let listener = tokio::net::TcpListener::bind(bind).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-ocr-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Runtime requirements
//!
//! - a pdfium shared library (system-wide, or pointed to by `PDFIUM_LIB_PATH`)
//! - the `tesseract` executable with the configured language data

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod routes;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CorsPolicy, ServerConfig, ServerConfigBuilder, TesseractConfig};
pub use error::{OcrError, PdfOcrError};
pub use pipeline::assemble::{OcrResponse, PageResult};
pub use pipeline::ocr::{BoundingBox, OcrEngine, TesseractEngine, TextBlock};
pub use pipeline::render::{PdfiumRasteriser, Rasteriser};
pub use process::{ocr_pages, process_pdf};
pub use routes::{router, AppState};
