//! Text extraction: hand an enhanced page to an OCR engine.
//!
//! [`TesseractEngine`] shells out to the `tesseract` executable with a fixed
//! language set and page segmentation mode. The page is staged as a temporary
//! PNG and the recognised text is read from stdout.
//!
//! [`extract_text`] is the pipeline's entry point: an engine failure is logged
//! and recorded as a [`PageError::OcrFailed`], and the page yields empty text
//! so the run can continue.

use crate::config::{DEFAULT_LANGUAGES, DEFAULT_PSM};
use crate::error::{ExtractError, PageError};
use image::{GrayImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// An OCR backend.
///
/// Implementations must be `Send + Sync`; the async entry points run the
/// pipeline on tokio's blocking pool.
pub trait OcrEngine: Send + Sync {
    /// Recognise the text on one enhanced page.
    fn recognize(&self, image: &GrayImage) -> Result<String, ExtractError>;
}

/// OCR through the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    languages: String,
    psm: u8,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract", DEFAULT_LANGUAGES, DEFAULT_PSM)
    }
}

impl TesseractEngine {
    pub fn new(program: impl Into<PathBuf>, languages: impl Into<String>, psm: u8) -> Self {
        Self {
            program: program.into(),
            languages: languages.into(),
            psm,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    pub fn psm(&self) -> u8 {
        self.psm
    }

    /// First line of `tesseract --version`, if the executable can be run.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.program).arg("--version").output().ok()?;

        // Older releases print the banner on stderr.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let source = if stdout.trim().is_empty() {
            stderr.trim()
        } else {
            stdout.trim()
        };

        source
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
    }

    /// Run tesseract on an image file already on disk.
    pub fn recognize_file(&self, png_path: &Path) -> Result<String, ExtractError> {
        let output = Command::new(&self.program)
            .arg(png_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.psm.to_string())
            .output()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::EngineFailed {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String, ExtractError> {
        let staged = tempfile::Builder::new()
            .prefix("pdfocr-page-")
            .suffix(".png")
            .tempfile()
            .map_err(ExtractError::Staging)?;

        image
            .save_with_format(staged.path(), ImageFormat::Png)
            .map_err(ExtractError::Encode)?;

        debug!(
            "Running {} on {}x{} page ({})",
            self.program.display(),
            image.width(),
            image.height(),
            self.languages
        );
        // `staged` is removed when it drops at the end of this call.
        self.recognize_file(staged.path())
    }
}

/// Recognise one page, recovering engine failures as empty text.
pub fn extract_text(
    engine: &dyn OcrEngine,
    page_num: usize,
    image: &GrayImage,
) -> (String, Option<PageError>) {
    match engine.recognize(image) {
        Ok(text) => (text, None),
        Err(e) => {
            warn!("Page {}: OCR failed, recording empty text: {}", page_num, e);
            (
                String::new(),
                Some(PageError::OcrFailed {
                    page: page_num,
                    detail: e.to_string(),
                }),
            )
        }
    }
}
