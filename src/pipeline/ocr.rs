//! OCR invocation: run the engine on one page image and collect text blocks.
//!
//! The engine is a black box behind [`OcrEngine`]. The shipped implementation,
//! [`TesseractEngine`], shells out to the `tesseract` CLI and parses its TSV
//! report; every call is a separate child process, so one engine instance can
//! serve concurrent requests without a lock.
//!
//! ## TSV layout
//!
//! ```text
//! level page_num block_num par_num line_num word_num left top width height conf text
//!   1      1        0        0       0        0      ...                   -1
//!   2      1        1        0       0        0      block bbox            -1
//!   5      1        1        1       1        1      word bbox             96.5  Hello
//! ```
//!
//! Level 2 rows open a block, level 5 rows carry words. Lines are identified
//! by `(par_num, line_num)` inside a block.

use crate::config::TesseractConfig;
use crate::error::OcrError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// One detected region of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    /// Engine-assigned block number (1-based, reading order).
    pub block_num: u32,
    /// Lines joined with `\n`.
    pub text: String,
    pub lines: Vec<String>,
    /// Mean word confidence, 0–100.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Pixel rectangle in page-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// OCR engine trait.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Check whether the engine can run at all.
    async fn is_available(&self) -> bool;

    /// Recognise the image at `image_path`, returning blocks in engine order.
    async fn recognize(&self, image_path: &Path) -> Result<Vec<TextBlock>, OcrError>;
}

/// OCR engine wrapping the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: TesseractConfig,
    dpi: u32,
}

impl TesseractEngine {
    /// `dpi` is forwarded to tesseract so it does not have to guess the
    /// resolution of the PNG it receives.
    pub fn new(config: TesseractConfig, dpi: u32) -> Self {
        Self { config, dpi }
    }

    fn engine_name(&self) -> String {
        self.config.binary.display().to_string()
    }

    fn command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .arg("--dpi")
            .arg(self.dpi.to_string())
            .arg("tsv")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.config.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, image_path: &Path) -> Result<Vec<TextBlock>, OcrError> {
        let mut cmd = self.command(image_path);
        let run = cmd.output();

        let output = match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
                .await
                .map_err(|_| OcrError::Timeout { secs })?,
            None => run.await,
        }
        .map_err(|e| OcrError::Unavailable {
            engine: self.engine_name(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("tesseract failed on {}: {}", image_path.display(), stderr);
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let tsv = String::from_utf8(output.stdout)
            .map_err(|e| OcrError::InvalidOutput(format!("non-UTF-8 output: {e}")))?;
        let blocks = parse_tsv(&tsv)?;
        debug!(
            "tesseract: {} blocks from {}",
            blocks.len(),
            image_path.display()
        );
        Ok(blocks)
    }
}

// ── TSV parsing ──────────────────────────────────────────────────────────────

const LEVEL_BLOCK: u8 = 2;
const LEVEL_WORD: u8 = 5;
const TSV_COLUMNS: usize = 12;

struct Row<'a> {
    level: u8,
    block_num: u32,
    par_num: u32,
    line_num: u32,
    bbox: BoundingBox,
    conf: f32,
    text: &'a str,
}

struct BlockBuilder {
    block_num: u32,
    bbox: BoundingBox,
    lines: Vec<String>,
    current_line: Option<(u32, u32)>,
    conf_sum: f32,
    words: usize,
}

impl BlockBuilder {
    fn new(block_num: u32, bbox: BoundingBox) -> Self {
        Self {
            block_num,
            bbox,
            lines: Vec::new(),
            current_line: None,
            conf_sum: 0.0,
            words: 0,
        }
    }

    fn push_word(&mut self, row: &Row<'_>) {
        let key = (row.par_num, row.line_num);
        match self.lines.last_mut() {
            Some(line) if self.current_line == Some(key) => {
                line.push(' ');
                line.push_str(row.text);
            }
            _ => {
                self.lines.push(row.text.to_string());
                self.current_line = Some(key);
            }
        }
        if row.conf >= 0.0 {
            self.conf_sum += row.conf;
        }
        self.words += 1;
    }

    fn finish(self) -> Option<TextBlock> {
        if self.words == 0 {
            return None;
        }
        Some(TextBlock {
            block_num: self.block_num,
            text: self.lines.join("\n"),
            confidence: self.conf_sum / self.words as f32,
            lines: self.lines,
            bbox: self.bbox,
        })
    }
}

/// Group a tesseract TSV report into text blocks.
///
/// Blocks keep the order in which tesseract reported them; blocks without any
/// non-blank word are dropped.
pub fn parse_tsv(tsv: &str) -> Result<Vec<TextBlock>, OcrError> {
    let mut builders: Vec<BlockBuilder> = Vec::new();

    for (line_no, line) in tsv.lines().enumerate() {
        if line_no == 0 && line.starts_with("level") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let row = parse_row(line).map_err(|detail| {
            OcrError::InvalidOutput(format!("line {}: {}", line_no + 1, detail))
        })?;

        match row.level {
            LEVEL_BLOCK => builders.push(BlockBuilder::new(row.block_num, row.bbox)),
            LEVEL_WORD if !row.text.trim().is_empty() => {
                let idx = match builders.iter().rposition(|b| b.block_num == row.block_num) {
                    Some(idx) => idx,
                    None => {
                        builders.push(BlockBuilder::new(row.block_num, BoundingBox::default()));
                        builders.len() - 1
                    }
                };
                builders[idx].push_word(&row);
            }
            _ => {}
        }
    }

    Ok(builders.into_iter().filter_map(BlockBuilder::finish).collect())
}

fn parse_row(line: &str) -> Result<Row<'_>, String> {
    let cols: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
    if cols.len() < TSV_COLUMNS - 1 {
        return Err(format!("expected {} columns, got {}", TSV_COLUMNS, cols.len()));
    }

    let int = |i: usize| -> Result<u32, String> {
        cols[i]
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("column {} is not an integer: {:?}", i + 1, cols[i]))
    };

    let level = int(0)? as u8;
    let conf = cols[10]
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("confidence is not a number: {:?}", cols[10]))?;

    Ok(Row {
        level,
        block_num: int(2)?,
        par_num: int(3)?,
        line_num: int(4)?,
        bbox: BoundingBox {
            left: int(6)?,
            top: int(7)?,
            width: int(8)?,
            height: int(9)?,
        },
        conf,
        text: cols.get(11).copied().unwrap_or("").trim_end_matches('\r'),
    })
}
