//! Upload intake: pull the PDF out of a multipart body and validate its name.
//!
//! The only check is a case-sensitive `.pdf` suffix on the client-supplied
//! filename. No content-type or magic
//! byte inspection happens here; a mislabelled file fails later in the
//! rasteriser and is reported as a processing error.

use crate::error::PdfOcrError;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::{debug, info};

/// Multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "file";

/// A validated, fully buffered upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Check the filename ends with the literal `.pdf` suffix.
pub fn is_pdf_filename(filename: &str) -> bool {
    filename.ends_with(".pdf")
}

/// Validate a filename and pair it with the upload bytes.
pub fn validate(filename: Option<String>, bytes: Bytes) -> Result<Upload, PdfOcrError> {
    match filename {
        Some(name) if is_pdf_filename(&name) => Ok(Upload {
            filename: name,
            bytes,
        }),
        other => Err(PdfOcrError::NotAPdf { filename: other }),
    }
}

/// Read the `file` field from a multipart body into memory.
///
/// The filename is validated before the body of the field is read, so a
/// rejected upload never buffers its content. Other fields are skipped.
///
/// `limit` is the body limit the router enforces; it is only used to word the
/// 413 message.
pub async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<Upload, PdfOcrError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().map(|s| s.to_string());
        debug!("Received field: name='{}', filename={:?}", name, filename);

        if name != UPLOAD_FIELD {
            continue;
        }

        info!("PDF received: {}", filename.as_deref().unwrap_or("<unnamed>"));
        if !filename.as_deref().is_some_and(is_pdf_filename) {
            return Err(PdfOcrError::NotAPdf { filename });
        }

        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        debug!("Read {} bytes of upload data", bytes.len());

        return validate(filename, bytes);
    }

    Err(PdfOcrError::MissingUpload)
}

fn multipart_error(e: MultipartError, limit: usize) -> PdfOcrError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PdfOcrError::UploadTooLarge { limit }
    } else {
        PdfOcrError::MalformedUpload(e.body_text())
    }
}
