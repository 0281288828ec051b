//! Configuration types for the OCR server.
//!
//! All server behaviour is controlled through [`ServerConfig`], built via its
//! [`ServerConfigBuilder`]. The binary maps CLI flags onto the builder; tests
//! and embedders use the builder directly.

use crate::error::PdfOcrError;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for the OCR server.
///
/// Built via [`ServerConfig::builder()`] or using [`ServerConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_ocr_server::{CorsPolicy, ServerConfig};
///
/// let config = ServerConfig::builder()
///     .dpi(200)
///     .cors(CorsPolicy::AllowList(vec!["https://app.example.org".into()]))
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to. Default: `0.0.0.0:8000`.
    pub bind: SocketAddr,

    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for text around 300 DPI; lower values lose small
    /// print, higher values mostly cost memory.
    pub dpi: u32,

    /// Cross-origin policy applied to every route. Default: permissive.
    pub cors: CorsPolicy,

    /// Directory holding per-page scratch images. Default: the working directory.
    pub temp_dir: PathBuf,

    /// Maximum accepted request body in bytes. Default: 100 MiB.
    pub max_upload_bytes: usize,

    /// Whether 500 responses include the underlying error text. Default: true.
    ///
    /// The detail is always logged server-side regardless of this flag.
    pub expose_error_detail: bool,

    /// Path to the pdfium shared library (file or directory).
    /// If None, binds to the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// OCR engine settings.
    pub tesseract: TesseractConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            dpi: 300,
            cors: CorsPolicy::default(),
            temp_dir: PathBuf::from("."),
            max_upload_bytes: 100 * 1024 * 1024,
            expose_error_detail: true,
            pdfium_lib_path: None,
            tesseract: TesseractConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind = addr;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn cors(mut self, policy: CorsPolicy) -> Self {
        self.config.cors = policy;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn expose_error_detail(mut self, v: bool) -> Self {
        self.config.expose_error_detail = v;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn tesseract(mut self, tesseract: TesseractConfig) -> Self {
        self.config.tesseract = tesseract;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, PdfOcrError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(PdfOcrError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(PdfOcrError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.tesseract.language.trim().is_empty() {
            return Err(PdfOcrError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.tesseract.psm > 13 {
            return Err(PdfOcrError::InvalidConfig(format!(
                "Page segmentation mode must be 0–13, got {}",
                c.tesseract.psm
            )));
        }
        if let CorsPolicy::AllowList(origins) = &c.cors {
            CorsPolicy::validate_origins(origins)?;
        }
        Ok(self.config)
    }
}

/// Settings for the Tesseract engine.
#[derive(Debug, Clone)]
pub struct TesseractConfig {
    /// Executable name or path. Default: `tesseract`.
    pub binary: PathBuf,

    /// Language pack(s), `+`-separated. Default: `eng`.
    pub language: String,

    /// Page segmentation mode (`--psm`). Default: 3 (fully automatic).
    pub psm: u8,

    /// Per-page timeout in seconds. Default: None (wait indefinitely).
    pub timeout_secs: Option<u64>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            psm: 3,
            timeout_secs: None,
        }
    }
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsPolicy {
    /// Any origin, method and header; credentials allowed. (default)
    #[default]
    Permissive,
    /// Only the listed origins; credentials allowed, methods and headers mirrored.
    AllowList(Vec<String>),
}

impl CorsPolicy {
    /// Parse a comma-separated origin list. Empty input or `*` means permissive.
    pub fn from_origins(s: &str) -> Self {
        let origins: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            CorsPolicy::Permissive
        } else {
            CorsPolicy::AllowList(origins)
        }
    }

    fn validate_origins(origins: &[String]) -> Result<(), PdfOcrError> {
        if origins.is_empty() {
            return Err(PdfOcrError::InvalidConfig(
                "CORS allow-list must name at least one origin".into(),
            ));
        }
        for origin in origins {
            HeaderValue::from_str(origin).map_err(|_| {
                PdfOcrError::InvalidConfig(format!("Invalid CORS origin '{origin}'"))
            })?;
        }
        Ok(())
    }
}
