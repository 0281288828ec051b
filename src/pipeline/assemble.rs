//! Result assembly: per-page block lists → the `{"results": [...]}` envelope.
//!
//! Each page becomes a single-key object, `{"page_<n>": [...]}`, with `n`
//! 1-based. The blocks are kept as [`serde_json::Value`] so the envelope does
//! not depend on the engine's result type.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// OCR output for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Text blocks in engine order.
    pub blocks: Vec<Value>,
}

impl PageResult {
    /// Key under which this page appears in the response.
    pub fn label(&self) -> String {
        format!("page_{}", self.page_num)
    }
}

impl Serialize for PageResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.label(), &self.blocks)?;
        map.end()
    }
}

/// Response body for a successful upload.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct OcrResponse {
    pub results: Vec<PageResult>,
}

impl OcrResponse {
    /// Wrap per-page block lists, numbering pages from 1 in the given order.
    pub fn from_pages(pages: Vec<Vec<Value>>) -> Self {
        let results = pages
            .into_iter()
            .enumerate()
            .map(|(i, blocks)| PageResult {
                page_num: i + 1,
                blocks,
            })
            .collect();
        Self { results }
    }

    pub fn page_count(&self) -> usize {
        self.results.len()
    }

    pub fn block_count(&self) -> usize {
        self.results.iter().map(|p| p.blocks.len()).sum()
    }
}
