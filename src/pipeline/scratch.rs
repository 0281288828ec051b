//! Scratch page images: one uniquely named PNG per page, owned by a guard.
//!
//! The OCR engine reads from a file path, so every page is written to disk
//! before recognition. The file lives exactly as long as its [`ScratchImage`]:
//! dropping the guard deletes it on every exit path, including `?` early
//! returns and panics. [`ScratchImage::remove`] deletes it explicitly so the
//! success path can report a failed deletion.

use crate::error::PdfOcrError;
use image::DynamicImage;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

/// Filename prefix of every scratch image.
pub const SCRATCH_PREFIX: &str = "temp_";

/// Filename suffix of every scratch image.
pub const SCRATCH_SUFFIX: &str = ".png";

/// Length of the random part of a scratch filename.
const RANDOM_ID_LEN: usize = 16;

/// A page image on disk, deleted when dropped.
#[derive(Debug)]
pub struct ScratchImage {
    path: TempPath,
}

impl ScratchImage {
    /// Encode `image` as PNG into `dir/temp_<random-id>.png`.
    ///
    /// PNG is lossless; compression artefacts on rendered glyphs hurt
    /// recognition accuracy.
    pub fn write(dir: &Path, image: &DynamicImage, page: usize) -> Result<Self, PdfOcrError> {
        let file = Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(SCRATCH_SUFFIX)
            .rand_bytes(RANDOM_ID_LEN)
            .tempfile_in(dir)
            .map_err(|e| scratch_error(dir, e))?;

        let (file, path) = file.into_parts();
        let mut writer = BufWriter::new(file);
        image
            .write_to(&mut writer, image::ImageFormat::Png)
            .map_err(|e| PdfOcrError::ImageEncodeFailed {
                page,
                detail: e.to_string(),
            })?;
        writer.flush().map_err(|e| scratch_error(dir, e))?;

        debug!("Page {} written to {}", page, path.display());
        Ok(Self { path })
    }

    /// Path handed to the OCR engine.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, logging rather than failing on error.
    ///
    /// The OCR result is already in hand at this point; a leftover file is
    /// worth a warning, not a failed request.
    pub fn remove(self) {
        let shown: PathBuf = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            warn!("Failed to remove scratch image {}: {}", shown.display(), e);
        }
    }
}

/// Async wrapper running PNG encoding and the write on the blocking pool.
pub async fn write_scratch(
    dir: PathBuf,
    image: DynamicImage,
    page: usize,
) -> Result<ScratchImage, PdfOcrError> {
    tokio::task::spawn_blocking(move || ScratchImage::write(&dir, &image, page))
        .await
        .map_err(|e| PdfOcrError::Internal(format!("Scratch write task panicked: {}", e)))?
}

fn scratch_error(dir: &Path, source: std::io::Error) -> PdfOcrError {
    PdfOcrError::ScratchFile {
        dir: dir.to_path_buf(),
        source,
    }
}
