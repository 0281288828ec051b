//! Error types for the pdf-ocr-server library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`PdfOcrError`] — **Request-fatal**: the upload is rejected or the
//!   pipeline cannot finish. Every handler failure ends up here, and
//!   [`PdfOcrError::status_code`] decides whether the caller sees a 400 or a
//!   500.
//!
//! * [`OcrError`] — **Engine-level**: the OCR engine could not produce text
//!   blocks for one image. The pipeline wraps it in [`PdfOcrError::Ocr`]
//!   together with the page number, because a single page failure aborts the
//!   whole request.

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Message returned to the client for every rejected upload.
pub const INVALID_UPLOAD_MESSAGE: &str = "Please upload a PDF file.";

/// Prefix of the message returned to the client for every processing failure.
pub const PROCESSING_ERROR_PREFIX: &str = "An error occurred during processing";

/// All request-fatal errors returned by the pdf-ocr-server library.
#[derive(Debug, Error)]
pub enum PdfOcrError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// Filename does not carry the `.pdf` suffix (or there is no filename).
    #[error("Upload '{}' is not a PDF file", filename.as_deref().unwrap_or("<unnamed>"))]
    NotAPdf { filename: Option<String> },

    /// The multipart body has no `file` field.
    #[error("No file provided; use the multipart field name 'file'")]
    MissingUpload,

    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    /// The upload exceeds the configured body limit.
    #[error("Upload exceeds the maximum size of {}", format_limit(*limit))]
    UploadTooLarge { limit: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password; the service never accepts one.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// The document opened but has no pages.
    #[error("PDF contains no pages")]
    EmptyDocument,

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Image / OCR errors ────────────────────────────────────────────────
    /// The rendered page could not be PNG-encoded.
    #[error("Image encoding failed for page {page}: {detail}")]
    ImageEncodeFailed { page: usize, detail: String },

    /// The OCR engine failed on a page.
    #[error("OCR failed on page {page}: {source}")]
    Ocr {
        page: usize,
        #[source]
        source: OcrError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A scratch file could not be created, written or removed.
    #[error("Scratch file error in '{dir}': {source}")]
    ScratchFile {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An OCR result could not be converted to JSON.
    #[error("Failed to serialise OCR result: {0}")]
    Serialisation(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfOcrError {
    /// `true` when the caller sent something we refuse to process.
    ///
    /// Validation errors are answered with 400 and are not logged as server
    /// faults.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PdfOcrError::NotAPdf { .. }
                | PdfOcrError::MissingUpload
                | PdfOcrError::MalformedUpload(_)
                | PdfOcrError::UploadTooLarge { .. }
        )
    }

    /// HTTP status the handler answers with.
    pub fn status_code(&self) -> StatusCode {
        if let PdfOcrError::UploadTooLarge { .. } = self {
            StatusCode::PAYLOAD_TOO_LARGE
        } else if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Message placed in the JSON response body.
    ///
    /// With `expose_detail` off, processing errors collapse to a generic
    /// message and the detail only reaches the server log.
    pub fn client_message(&self, expose_detail: bool) -> String {
        if let PdfOcrError::UploadTooLarge { .. } = self {
            format!("{self}.")
        } else if self.is_validation() {
            INVALID_UPLOAD_MESSAGE.to_string()
        } else if expose_detail {
            format!("{PROCESSING_ERROR_PREFIX}: {self}")
        } else {
            format!("{PROCESSING_ERROR_PREFIX}.")
        }
    }
}

/// Whole MiB when the limit is a multiple of one, bytes otherwise.
fn format_limit(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// An error raised by an [`crate::pipeline::ocr::OcrEngine`] for one image.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The engine binary could not be started.
    #[error("OCR engine '{engine}' is unavailable: {reason}")]
    Unavailable { engine: String, reason: String },

    /// The engine ran but reported failure.
    #[error("OCR engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The engine did not finish in time.
    #[error("OCR timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The engine output could not be parsed.
    #[error("Unparseable OCR output: {0}")]
    InvalidOutput(String),
}
