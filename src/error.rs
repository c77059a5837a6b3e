//! Error types for the edgequake-pdfocr library.
//!
//! Errors are split by where they are allowed to travel:
//!
//! * [`OcrError`] — **Fatal**: the document cannot be processed (bad input,
//!   corrupt PDF, output file not writable). Returned as `Err(OcrError)` from
//!   the top-level entry points and mapped to an HTTP-style status code by
//!   [`OcrError::status_code`].
//!
//! * [`PageError`] — **Non-fatal**: one page degraded or produced no text.
//!   Recorded in [`crate::output::PageSummary`] while the run moves on to the
//!   next page.
//!
//! Each pipeline stage has its own error type ([`RasterizeError`],
//! [`EnhanceError`], [`ExtractError`], [`SinkError`]). Rasterisation and sink
//! errors convert into [`OcrError`]; enhancement and extraction errors are
//! recovered inside the page loop and only surface as [`PageError`]s.

use crate::pipeline::enhance::EnhanceStep;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request carried no upload in the expected field.
    #[error("No file uploaded: expected a multipart field named '{field}'")]
    MissingUpload { field: String },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input is not a usable file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The input was read, but is not a PDF.
    #[error("Input is not a valid PDF: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    // ── Document errors ───────────────────────────────────────────────────
    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Rasterisation failed; no page of the document was recognised.
    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    /// The output sink rejected a page and the run was configured to abort.
    #[error(transparent)]
    Sink(#[from] SinkError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is loaded at runtime. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide (https://github.com/bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// HTTP-style status for this error: 400 for caller input problems,
    /// 500 for everything else.
    pub fn status_code(&self) -> u16 {
        match self {
            OcrError::MissingUpload { .. }
            | OcrError::FileNotFound { .. }
            | OcrError::PermissionDenied { .. }
            | OcrError::InvalidInput { .. }
            | OcrError::NotAPdf { .. }
            | OcrError::PageOutOfRange { .. } => 400,
            _ => 500,
        }
    }

    /// True when the error was caused by the caller's input rather than by
    /// the pipeline or its environment.
    pub fn is_input_error(&self) -> bool {
        self.status_code() == 400
    }
}

/// Failures of the rasterizer adapter. Always fatal for the document.
#[derive(Debug, Error)]
pub enum RasterizeError {
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{source_name}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { source_name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{source_name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { source_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{source_name}'")]
    WrongPassword { source_name: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// A rendered page could not be written to the images directory.
    #[error("Failed to save page {page} image to '{path}': {source}")]
    PersistFailed {
        page: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The images directory could not be created.
    #[error("Failed to create images directory '{path}': {source}")]
    ImagesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures inside the enhancement chain. Never escapes
/// [`crate::pipeline::enhance::enhance`]; recorded on the returned image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnhanceError {
    /// The image has no pixels; filters have nothing to work on.
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// An image-library filter panicked while running a step.
    #[error("step '{step}' panicked: {detail}")]
    StepPanicked { step: EnhanceStep, detail: String },
}

impl EnhanceError {
    /// The step that could not run. An empty image fails at the first step.
    pub fn step(&self) -> EnhanceStep {
        match self {
            EnhanceError::EmptyImage { .. } => EnhanceStep::Grayscale,
            EnhanceError::StepPanicked { step, .. } => *step,
        }
    }
}

/// Failures of the OCR engine. Recovered per page as empty text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Scratch file for the page image could not be created or written.
    #[error("failed to stage page image for OCR: {0}")]
    Staging(#[source] std::io::Error),

    /// The page image could not be encoded for the engine.
    #[error("failed to encode page image for OCR: {0}")]
    Encode(#[source] image::ImageError),

    /// The OCR executable could not be started.
    #[error("failed to execute '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OCR executable ran but reported failure.
    #[error("'{program}' exited with status {code:?}: {stderr}")]
    EngineFailed {
        program: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// Engine-specific failure reported by a custom [`crate::pipeline::extract::OcrEngine`].
    #[error("{0}")]
    Engine(String),
}

/// Failures writing recognised text to an output sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A stale output file from a previous run could not be removed.
    #[error("Failed to remove previous output file '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or append to the output file.
    #[error("Failed to write output file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The receiving end of a sink went away.
    #[error("Output sink closed: {0}")]
    Closed(String),
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::PageSummary`]. The run continues with the next
/// page unless the sink failure policy says otherwise.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Enhancement stopped early; OCR ran on the last good image.
    #[error("Page {page}: enhancement degraded at '{step}': {detail}")]
    EnhanceDegraded {
        page: usize,
        step: String,
        detail: String,
    },

    /// OCR engine failed; the page was recorded as empty text.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// The sink rejected the page text.
    #[error("Page {page}: output failed: {detail}")]
    SinkFailed { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_upload_is_a_client_error() {
        let e = OcrError::MissingUpload {
            field: "file".into(),
        };
        assert_eq!(e.status_code(), 400);
        assert!(e.to_string().contains("'file'"), "got: {e}");
    }

    #[test]
    fn not_a_pdf_is_a_client_error() {
        let e = OcrError::NotAPdf {
            source_name: "upload.txt".into(),
            magic: b"hell".to_vec(),
        };
        assert_eq!(e.status_code(), 400);
        assert!(e.is_input_error());
    }

    #[test]
    fn rasterize_errors_are_server_errors() {
        let e: OcrError = RasterizeError::CorruptPdf {
            source_name: "scan.pdf".into(),
            detail: "bad xref".into(),
        }
        .into();
        assert_eq!(e.status_code(), 500);
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn sink_error_converts_and_displays_path() {
        let e: OcrError = SinkError::Write {
            path: PathBuf::from("/tmp/out.txt"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        }
        .into();
        assert_eq!(e.status_code(), 500);
        assert!(e.to_string().contains("/tmp/out.txt"));
    }

    #[test]
    fn page_error_display() {
        let e = PageError::OcrFailed {
            page: 3,
            detail: "tesseract missing".into(),
        };
        assert_eq!(e.to_string(), "Page 3: OCR failed: tesseract missing");
    }

    #[test]
    fn enhance_error_names_step() {
        let e = EnhanceError::StepPanicked {
            step: EnhanceStep::MedianFilter,
            detail: "boom".into(),
        };
        assert!(e.to_string().contains("median"), "got: {e}");
    }
}
