//! Configuration types for PDF OCR runs.
//!
//! All run behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]. The values that used to be scattered constants
//! (input file, output file, image folder, DPI, languages, segmentation mode)
//! live here and are handed to the pipeline when it is constructed.

use crate::error::OcrError;
use crate::pipeline::extract::OcrEngine;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default render resolution. Scans of small Devanagari print need the extra
/// pixels; 300 DPI loses matras and conjuncts.
pub const DEFAULT_DPI: u32 = 600;

/// Default tesseract language set: English + Marathi.
pub const DEFAULT_LANGUAGES: &str = "eng+mar";

/// Default tesseract page segmentation mode: a single uniform block of text.
pub const DEFAULT_PSM: u8 = 6;

/// Highest page segmentation mode tesseract understands.
pub const MAX_PSM: u8 = 13;

/// Smallest accepted `max_rendered_pixels`.
pub const MIN_RENDERED_PIXELS: u32 = 100;

static RE_LANGUAGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+(\+[A-Za-z0-9_]+)*$").unwrap());

/// Configuration for a PDF OCR run.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfocr::{OcrConfig, OutputTarget};
///
/// let config = OcrConfig::builder()
///     .dpi(300)
///     .ocr_languages("eng+hin")
///     .output_target(OutputTarget::File("output.txt".into()))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Document to process when the caller uses [`crate::run`]. Default: None.
    pub input_source: Option<InputSource>,

    /// Where recognised text goes when the caller uses [`crate::run`].
    /// Default: [`OutputTarget::Collect`].
    pub output_target: OutputTarget,

    /// Rendering DPI used when rasterising each PDF page. Range: 72–1200. Default: 600.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. At
    /// least 100. Default: 12 000.
    ///
    /// 600 DPI on an A3 page is already ~7 000 × 9 900 px. The cap keeps a
    /// poster-sized page from allocating gigabytes.
    pub max_rendered_pixels: u32,

    /// Tesseract language set, `+`-separated. Default: `eng+mar`.
    pub ocr_languages: String,

    /// Tesseract page segmentation mode (`--psm`). Range: 0–13. Default: 6.
    pub psm_mode: u8,

    /// Collected output shape: one string per page (false) or all pages
    /// joined with `\n` (true). Default: false.
    pub merge_pages: bool,

    /// Directory where every rendered page is saved as `page_<n>.png` before
    /// OCR starts. Default: None (pages stay in memory only).
    pub images_dir: Option<PathBuf>,

    /// OCR executable. Default: `tesseract` (resolved through `PATH`).
    pub tesseract_cmd: PathBuf,

    /// Pre-constructed OCR engine. Takes precedence over `tesseract_cmd`.
    pub engine: Option<Arc<dyn OcrEngine>>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// What to do when the sink rejects a page. Default: [`FailurePolicy::Abort`].
    pub sink_failure: FailurePolicy,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Explicit pdfium library (file or directory). Default: None.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Per-page progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            input_source: None,
            output_target: OutputTarget::default(),
            dpi: DEFAULT_DPI,
            max_rendered_pixels: 12_000,
            ocr_languages: DEFAULT_LANGUAGES.to_string(),
            psm_mode: DEFAULT_PSM,
            merge_pages: false,
            images_dir: None,
            tesseract_cmd: PathBuf::from("tesseract"),
            engine: None,
            pages: PageSelection::default(),
            password: None,
            sink_failure: FailurePolicy::default(),
            download_timeout_secs: 120,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("input_source", &self.input_source)
            .field("output_target", &self.output_target)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_languages", &self.ocr_languages)
            .field("psm_mode", &self.psm_mode)
            .field("merge_pages", &self.merge_pages)
            .field("images_dir", &self.images_dir)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("engine", &self.engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("sink_failure", &self.sink_failure)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the constraints the builder enforces. Also used on configs
    /// assembled by hand.
    pub fn validate(&self) -> Result<(), OcrError> {
        if !(72..=1200).contains(&self.dpi) {
            return Err(OcrError::InvalidConfig(format!(
                "DPI must be 72–1200, got {}",
                self.dpi
            )));
        }
        if self.psm_mode > MAX_PSM {
            return Err(OcrError::InvalidConfig(format!(
                "Page segmentation mode must be 0–{MAX_PSM}, got {}",
                self.psm_mode
            )));
        }
        if !RE_LANGUAGES.is_match(&self.ocr_languages) {
            return Err(OcrError::InvalidConfig(format!(
                "OCR languages must look like 'eng' or 'eng+mar', got '{}'",
                self.ocr_languages
            )));
        }
        if self.max_rendered_pixels < MIN_RENDERED_PIXELS {
            return Err(OcrError::InvalidConfig(format!(
                "max_rendered_pixels must be ≥ {MIN_RENDERED_PIXELS}, got {}",
                self.max_rendered_pixels
            )));
        }
        Ok(())
    }
}

/// Builder for [`OcrConfig`].
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl fmt::Debug for OcrConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl OcrConfigBuilder {
    pub fn input_source(mut self, source: InputSource) -> Self {
        self.config.input_source = Some(source);
        self
    }

    pub fn output_target(mut self, target: OutputTarget) -> Self {
        self.config.output_target = target;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px;
        self
    }

    pub fn ocr_languages(mut self, languages: impl Into<String>) -> Self {
        self.config.ocr_languages = languages.into();
        self
    }

    pub fn psm_mode(mut self, psm: u8) -> Self {
        self.config.psm_mode = psm;
        self
    }

    pub fn merge_pages(mut self, v: bool) -> Self {
        self.config.merge_pages = v;
        self
    }

    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = Some(dir.into());
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn sink_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.sink_failure = policy;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where the PDF comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Local file.
    Path(PathBuf),
    /// HTTP/HTTPS URL, downloaded to a temp directory first.
    Url(String),
    /// PDF bytes already in memory (e.g. an uploaded file).
    Bytes {
        /// Label used in logs and error messages.
        name: String,
        data: Arc<[u8]>,
    },
}

impl InputSource {
    /// Interpret a CLI-style argument: URLs become [`InputSource::Url`],
    /// everything else a path.
    pub fn parse(input: &str) -> Self {
        if crate::pipeline::input::is_url(input) {
            InputSource::Url(input.to_string())
        } else {
            InputSource::Path(PathBuf::from(input))
        }
    }

    pub fn bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        InputSource::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Human-readable label for logs and errors.
    pub fn display_name(&self) -> String {
        match self {
            InputSource::Path(p) => p.display().to_string(),
            InputSource::Url(u) => u.clone(),
            InputSource::Bytes { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            InputSource::Url(u) => f.debug_tuple("Url").field(u).finish(),
            InputSource::Bytes { name, data } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
        }
    }
}

impl From<PathBuf> for InputSource {
    fn from(p: PathBuf) -> Self {
        InputSource::Path(p)
    }
}

impl From<&str> for InputSource {
    fn from(s: &str) -> Self {
        InputSource::parse(s)
    }
}

/// Where recognised text goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTarget {
    /// Collect pages in memory; serialised to JSON by the caller. (default)
    #[default]
    Collect,
    /// Append labelled page blocks to a text file, replacing any previous run.
    File(PathBuf),
}

/// What the pipeline does when the sink rejects a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop the run and report the error. (default)
    #[default]
    Abort,
    /// Log, record a [`crate::error::PageError::SinkFailed`], keep going.
    Continue,
}

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Process all pages (default).
    #[default]
    All,
    /// Process a single page (1-indexed).
    Single(usize),
    /// Process a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Process specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
