//! # edgequake-pdfocr
//!
//! OCR scanned PDF documents page by page with tesseract.
//!
//! Each page is rasterised at 600 DPI, cleaned up by a fixed enhancement
//! chain tuned for printed English and Marathi (Devanagari) text, and
//! recognised with `tesseract -l eng+mar --psm 6`. The text goes either to a
//! flat file of `Image <n> - Full Page:` blocks or to a JSON payload.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file, URL download, or in-memory bytes
//!  ├─ 2. Render     rasterise pages via pdfium at 600 DPI
//!  ├─ 3. Persist    optional page_<n>.png per page
//!  ├─ 4. Normalize  colour mode → RGB8 or L8
//!  ├─ 5. Enhance    grayscale, autocontrast, median 5×5, threshold 150,
//!  │                max 3×3, sharpen, contrast ×2.5
//!  ├─ 6. Extract    tesseract eng+mar, PSM 6
//!  ├─ 7. Polish     strip form feeds, CRLF, trailing spaces
//!  └─ 8. Sink       text file or {"texts": [...]} / {"text": "..."}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfocr::{convert, convert_to_file, OcrConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OcrConfig::builder().images_dir("images").build()?;
//!
//!     // Flat text file, regenerated on every run.
//!     let report = convert_to_file("scan.pdf", "output.txt", &config).await?;
//!     eprintln!("{} pages, {} failed", report.stats.total_pages, report.stats.failed_pages);
//!
//!     // Or collect in memory.
//!     let output = convert("scan.pdf", &config).await?;
//!     println!("{}", serde_json::to_string(&output.payload(false))?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdfocr = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! * a pdfium shared library (see [`pipeline::render::bind_pdfium`])
//! * `tesseract` on `PATH` with the `eng` and `mar` traineddata installed,
//!   unless a custom [`OcrEngine`] is configured

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod handler;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod sink;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FailurePolicy, InputSource, OcrConfig, OcrConfigBuilder, OutputTarget, PageSelection,
};
pub use convert::{
    convert, convert_from_bytes, convert_sync, convert_to_file, inspect, inspect_with_config, run,
};
pub use error::{EnhanceError, ExtractError, OcrError, PageError, RasterizeError, SinkError};
pub use handler::{HandlerResponse, RequestHandler, ResponseBody, UploadField};
pub use output::{
    DocumentMetadata, OcrOutput, PageSummary, RunOutput, RunReport, RunStats, TextPayload,
};
pub use pipeline::enhance::{enhance, EnhanceStep, Enhanced};
pub use pipeline::extract::{OcrEngine, TesseractEngine};
pub use pipeline::normalize::normalize;
pub use pipeline::render::RenderedPage;
pub use pipeline::Pipeline;
pub use progress::{NoopProgressCallback, OcrProgressCallback, ProgressCallback};
pub use sink::{AggregatingSink, FileSink, PageSink};
