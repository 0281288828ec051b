//! Server binary for pdf-ocr-server.
//!
//! A thin shim over the library crate that maps CLI flags to `ServerConfig`,
//! checks the external engines, and serves the router until Ctrl+C/SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use pdf_ocr_server::{
    router, AppState, CorsPolicy, OcrEngine, PdfiumRasteriser, ServerConfig, TesseractConfig,
    TesseractEngine,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default port (8000)
  pdf-ocr-server

  # Restrict cross-origin access and use 200 DPI
  pdf-ocr-server --cors-origins http://localhost:3000,https://app.example.org --dpi 200

  # Upload a document
  curl -F "file=@scan.pdf" http://localhost:8000/upload-pdf/

ENDPOINTS:
  GET  /              {"message": "Server is working!"}
  POST /upload-pdf/   multipart field "file" → {"results": [{"page_1": [...]}, ...]}

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH     Path to libpdfium (file or directory); default: system library
  TESSERACT_PATH      tesseract executable; default: tesseract on PATH
  RUST_LOG            Overrides the log filter derived from --verbose/--quiet
"#;

/// Serve PDF OCR over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-ocr-server",
    version,
    about = "HTTP service that OCRs every page of an uploaded PDF",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "PDF_OCR_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDF_OCR_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Allowed CORS origins, comma-separated. Empty or `*` allows any origin.
    #[arg(long, env = "PDF_OCR_CORS_ORIGINS", default_value = "")]
    cors_origins: String,

    /// Directory for temporary page images.
    #[arg(long, env = "PDF_OCR_TEMP_DIR", default_value = ".")]
    temp_dir: PathBuf,

    /// Maximum upload size in MiB.
    #[arg(long, env = "PDF_OCR_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: usize,

    /// Tesseract language pack(s), e.g. `eng` or `eng+deu`.
    #[arg(long, env = "PDF_OCR_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "PDF_OCR_PSM", default_value_t = 3)]
    psm: u8,

    /// tesseract executable.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Per-page OCR timeout in seconds. Unset waits indefinitely.
    #[arg(long, env = "PDF_OCR_TIMEOUT")]
    ocr_timeout: Option<u64>,

    /// Path to the pdfium library (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Return a generic 500 message instead of the underlying error text.
    #[arg(long, env = "PDF_OCR_HIDE_ERROR_DETAIL")]
    hide_error_detail: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "pdf_ocr_server=debug,tower_http=debug"
    } else if cli.quiet {
        "error"
    } else {
        "pdf_ocr_server=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Engines ──────────────────────────────────────────────────────────
    let rasteriser = PdfiumRasteriser::new(config.pdfium_lib_path.as_deref())
        .context("PDFium engine unavailable")?;

    let engine = TesseractEngine::new(config.tesseract.clone(), config.dpi);
    if !engine.is_available().await {
        tracing::warn!(
            "'{}' could not be started; uploads will fail until it is installed",
            config.tesseract.binary.display()
        );
    }

    tracing::info!("Starting pdf-ocr-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "DPI: {}, OCR language: {}, CORS: {:?}, temp dir: {}",
        config.dpi,
        config.tesseract.language,
        config.cors,
        config.temp_dir.display()
    );

    // ── Serve ────────────────────────────────────────────────────────────
    let bind = config.bind;
    let app = router(AppState::new(config, Arc::new(rasteriser), Arc::new(engine)));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!("Listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Map CLI args to `ServerConfig`.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let tesseract = TesseractConfig {
        binary: cli.tesseract.clone(),
        language: cli.lang.clone(),
        psm: cli.psm,
        timeout_secs: cli.ocr_timeout,
    };

    let mut builder = ServerConfig::builder()
        .bind(cli.bind)
        .dpi(cli.dpi)
        .cors(CorsPolicy::from_origins(&cli.cors_origins))
        .temp_dir(cli.temp_dir.clone())
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024))
        .expose_error_detail(!cli.hide_error_detail)
        .tesseract(tesseract);

    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown..."),
    }
}
