//! Pipeline stages for PDF-to-OCR processing.
//!
//! Each submodule implements exactly one step, so each is testable on its own
//! and the rasteriser or OCR engine can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ render ──▶ scratch ──▶ ocr ──▶ assemble
//! (multipart) (pdfium)  (temp PNG)  (tesseract) (JSON)
//! ```
//!
//! 1. [`upload`]   — pull the `file` field out of the multipart body and
//!    check its `.pdf` suffix
//! 2. [`render`]   — rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`scratch`]  — write each page as `temp_<id>.png`, deleted when its
//!    guard drops
//! 4. [`ocr`]      — run the engine on the scratch file and group its output
//!    into text blocks
//! 5. [`assemble`] — number pages from 1 and wrap them in the response envelope

pub mod assemble;
pub mod ocr;
pub mod render;
pub mod scratch;
pub mod upload;
