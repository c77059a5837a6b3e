//! Pipeline stages for PDF OCR.
//!
//! Each submodule implements exactly one transformation step; [`Pipeline`]
//! drives them one page at a time and hands the text to a [`PageSink`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ [persist] ──▶ normalize ──▶ enhance ──▶ extract ──▶ postprocess ──▶ sink
//! (path/URL)  (pdfium)   (PNG files)   (RGB | L)    (7 filters)  (tesseract)   (hygiene)
//! ```
//!
//! 1. [`input`]     — resolve the path, URL or byte buffer and check it is a PDF
//! 2. [`render`]    — rasterise selected pages at the configured DPI
//! 3. [`persist`]   — optionally save every page as `page_<n>.png` before OCR
//! 4. [`normalize`] — fold the page's colour mode into RGB8 or L8
//! 5. [`enhance`]   — fixed binarising filter chain
//! 6. [`extract`]   — OCR engine call; failures become empty text
//! 7. [`postprocess`] — strip tesseract artefacts from the text
//!
//! Rasterisation errors are fatal for the document. Everything after it is
//! recovered per page and recorded in the [`RunReport`].

pub mod enhance;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod persist;
pub mod postprocess;
pub mod render;

use crate::config::{FailurePolicy, OcrConfig};
use crate::error::{OcrError, PageError};
use crate::output::{PageSummary, RunReport, RunStats};
use crate::progress::{NoopProgressCallback, OcrProgressCallback};
use crate::sink::PageSink;
use extract::{OcrEngine, TesseractEngine};
use input::ResolvedInput;
use render::RenderedPage;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

static NOOP_PROGRESS: NoopProgressCallback = NoopProgressCallback;

/// The page pipeline, bound to one configuration and one OCR engine.
///
/// Cheap to clone; the engine is shared.
#[derive(Clone)]
pub struct Pipeline {
    config: OcrConfig,
    engine: Arc<dyn OcrEngine>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validate `config` and pick the OCR engine: the injected one if any,
    /// otherwise tesseract with the configured languages and PSM.
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        config.validate()?;
        let engine = match config.engine {
            Some(ref engine) => Arc::clone(engine),
            None => Arc::new(TesseractEngine::new(
                config.tesseract_cmd.clone(),
                config.ocr_languages.clone(),
                config.psm_mode,
            )),
        };
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    fn progress(&self) -> &dyn OcrProgressCallback {
        match self.config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &NOOP_PROGRESS,
        }
    }

    /// Rasterise a resolved document, persist the pages if an images
    /// directory is configured, then recognise every page into `sink`.
    ///
    /// Blocking. Rasterisation or persist failures abort before any OCR.
    pub fn run_document(
        &self,
        input: &ResolvedInput,
        sink: &mut dyn PageSink,
    ) -> Result<RunReport, OcrError> {
        let total_start = Instant::now();
        info!("Starting OCR: {}", input.name());

        let render_start = Instant::now();
        let pages = render::rasterize(input, &self.config)?;
        if let Some(ref dir) = self.config.images_dir {
            persist::persist_pages(&pages, dir)?;
        }
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        info!(
            "Rendered {} page(s) in {}ms",
            pages.len(),
            render_duration_ms
        );

        let mut report = self.run_pages(pages, sink)?;
        report.stats.render_duration_ms = render_duration_ms;
        report.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Recognise already-rasterised pages into `sink`, strictly in the order
    /// given.
    ///
    /// Every page reaches the sink exactly once, with empty text if the
    /// engine failed. Only a sink error under [`FailurePolicy::Abort`] stops
    /// the run early.
    pub fn run_pages(
        &self,
        pages: Vec<RenderedPage>,
        sink: &mut dyn PageSink,
    ) -> Result<RunReport, OcrError> {
        let start = Instant::now();
        let total = pages.len();
        let progress = self.progress();
        progress.on_conversion_start(total);

        let mut summaries = Vec::with_capacity(total);
        let mut stats = RunStats {
            total_pages: total,
            ..RunStats::default()
        };
        let mut success_count = 0;

        for page in pages {
            let page_start = Instant::now();
            let page_num = page.page_num;
            progress.on_page_start(page_num, total);

            let mut errors = Vec::new();

            let image = normalize::normalize(page.image);
            debug!(
                "Page {}: {}x{} {:?}",
                page_num,
                image.width(),
                image.height(),
                normalize::ColorMode::of(&image)
            );
            let enhanced = enhance::enhance(&image);
            drop(image);
            if let Some(ref e) = enhanced.error {
                errors.push(PageError::EnhanceDegraded {
                    page: page_num,
                    step: e.step().to_string(),
                    detail: e.to_string(),
                });
            }

            let (raw, ocr_error) = extract::extract_text(self.engine.as_ref(), page_num, &enhanced.image);
            let ocr_ok = ocr_error.is_none();
            errors.extend(ocr_error);

            let text = postprocess::clean_text(&raw);
            let mut emitted = true;
            if let Err(e) = sink.emit(page_num, &text) {
                match self.config.sink_failure {
                    FailurePolicy::Abort => {
                        progress.on_page_error(page_num, total, &e.to_string());
                        return Err(e.into());
                    }
                    FailurePolicy::Continue => {
                        warn!("Page {}: output failed, continuing: {}", page_num, e);
                        emitted = false;
                        errors.push(PageError::SinkFailed {
                            page: page_num,
                            detail: e.to_string(),
                        });
                    }
                }
            }

            for e in &errors {
                progress.on_page_error(page_num, total, &e.to_string());
            }
            let chars = text.chars().count();
            progress.on_page_complete(page_num, total, chars);

            if emitted {
                stats.processed_pages += 1;
                if ocr_ok {
                    success_count += 1;
                }
            }
            let summary = PageSummary {
                page_num,
                chars,
                duration_ms: page_start.elapsed().as_millis() as u64,
                errors,
            };
            if summary.ocr_failed() {
                stats.failed_pages += 1;
            }
            if summary.degraded() {
                stats.degraded_pages += 1;
            }
            debug!(
                "Page {}/{}: {} chars in {}ms",
                page_num, total, chars, summary.duration_ms
            );
            summaries.push(summary);
        }

        stats.ocr_duration_ms = start.elapsed().as_millis() as u64;
        stats.total_duration_ms = stats.ocr_duration_ms;
        progress.on_conversion_complete(total, success_count);
        info!(
            "OCR complete: {}/{} page(s) recognised, {} failed, {} degraded, {}ms",
            success_count, total, stats.failed_pages, stats.degraded_pages, stats.ocr_duration_ms
        );

        Ok(RunReport {
            pages: summaries,
            stats,
        })
    }
}
