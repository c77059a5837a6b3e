//! Result types returned by the pipeline and the conversion entry points.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Character count of the cleaned text handed to the sink.
    pub chars: usize,
    /// Wall-clock time for normalise + enhance + OCR + emit.
    pub duration_ms: u64,
    /// Non-fatal problems recorded for this page.
    pub errors: Vec<PageError>,
}

impl PageSummary {
    pub fn ocr_failed(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, PageError::OcrFailed { .. }))
    }

    pub fn degraded(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, PageError::EnhanceDegraded { .. }))
    }
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages handed to the pipeline.
    pub total_pages: usize,
    /// Pages whose text reached the sink.
    pub processed_pages: usize,
    /// Pages where OCR failed and empty text was recorded.
    pub failed_pages: usize,
    /// Pages where the enhancement chain stopped early.
    pub degraded_pages: usize,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Per-page summaries plus run statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub pages: Vec<PageSummary>,
    pub stats: RunStats,
}

impl RunReport {
    /// Every non-fatal error of the run, in page order.
    pub fn errors(&self) -> impl Iterator<Item = &PageError> {
        self.pages.iter().flat_map(|p| p.errors.iter())
    }
}

/// JSON body returned by the request handler and `pdfocr --json`.
///
/// Page texts are tesseract's output after
/// [`clean_text`](crate::pipeline::postprocess::clean_text), not the raw
/// engine output:
///
/// * NUL and form-feed characters removed
/// * `\r\n` and lone `\r` turned into `\n`
/// * trailing whitespace trimmed from every line
/// * runs of 4+ newlines collapsed to 3
/// * zero-width space, BOM, soft hyphen and word joiner removed
///   (ZWJ/ZWNJ are kept)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPayload {
    /// One string per page, in page order.
    Pages { texts: Vec<String> },
    /// All pages joined with `\n`.
    Merged { text: String },
}

impl TextPayload {
    /// Shape `texts` according to `merge_pages`.
    pub fn from_texts(texts: Vec<String>, merge_pages: bool) -> Self {
        if merge_pages {
            TextPayload::Merged {
                text: texts.join("\n"),
            }
        } else {
            TextPayload::Pages { texts }
        }
    }
}

/// Collected output of [`crate::convert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Cleaned text per page, in page order.
    pub texts: Vec<String>,
    pub report: RunReport,
}

impl OcrOutput {
    /// All pages joined with `\n`.
    pub fn merged_text(&self) -> String {
        self.texts.join("\n")
    }

    pub fn payload(&self, merge_pages: bool) -> TextPayload {
        TextPayload::from_texts(self.texts.clone(), merge_pages)
    }
}

/// Result of [`crate::run`], shaped by the configured output target.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    /// Pages were collected in memory.
    Collected(OcrOutput),
    /// Pages were appended to a text file.
    Written {
        path: std::path::PathBuf,
        report: RunReport,
    },
}

impl RunOutput {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutput::Collected(output) => &output.report,
            RunOutput::Written { report, .. } => report,
        }
    }
}

/// Document-level metadata read by [`crate::inspect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
