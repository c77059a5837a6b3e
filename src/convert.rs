//! Async and blocking entry points.
//!
//! Input resolution (which may download) runs on the caller's runtime. The
//! rest of the pipeline is blocking (pdfium, tesseract, file appends) and is
//! moved onto tokio's blocking pool in one piece, together with the sink.

use crate::config::{InputSource, OcrConfig, OutputTarget};
use crate::error::OcrError;
use crate::output::{DocumentMetadata, OcrOutput, RunOutput, RunReport};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::{render, Pipeline};
use crate::sink::{AggregatingSink, FileSink, PageSink};
use std::path::Path;
use tracing::info;

/// OCR a PDF and collect the text of every page in memory.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`  — Local path, HTTP/HTTPS URL, or [`InputSource::Bytes`]
/// * `config` — Run configuration
///
/// # Returns
/// `Ok(OcrOutput)` even when some pages failed OCR; those pages hold empty
/// text and are listed in `output.report`.
///
/// # Errors
/// Returns `Err(OcrError)` only for fatal errors: unreadable input, not a
/// PDF, rasterisation failure, or a sink error under
/// [`crate::FailurePolicy::Abort`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdfocr::{convert, OcrConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = OcrConfig::default();
/// let output = convert("scan.pdf", &config).await?;
/// for (i, text) in output.texts.iter().enumerate() {
///     println!("--- page {} ---\n{}", i + 1, text);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    input: impl Into<InputSource>,
    config: &OcrConfig,
) -> Result<OcrOutput, OcrError> {
    let source = input.into();
    let pipeline = Pipeline::new(config.clone())?;
    let resolved = input::resolve_input(&source, config.download_timeout_secs).await?;

    let (report, sink) = run_blocking(pipeline, resolved, AggregatingSink::new()).await?;
    Ok(OcrOutput {
        texts: sink.into_texts(),
        report,
    })
}

/// OCR a PDF and append `Image <n> - Full Page:` blocks to `output_path`.
///
/// Any existing file at `output_path` is deleted before the input is even
/// opened, so a rerun regenerates it from scratch and a failed rerun leaves
/// no stale text behind. Only an invalid `config` is reported first.
pub async fn convert_to_file(
    input: impl Into<InputSource>,
    output_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<RunReport, OcrError> {
    let source = input.into();
    let pipeline = Pipeline::new(config.clone())?;

    let path = output_path.as_ref();
    info!("Writing OCR text to {}", path.display());
    let sink = FileSink::create(path)?;
    let resolved = input::resolve_input(&source, config.download_timeout_secs).await?;

    let (report, _sink) = run_blocking(pipeline, resolved, sink).await?;
    Ok(report)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl Into<InputSource>,
    config: &OcrConfig,
) -> Result<OcrOutput, OcrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| OcrError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// OCR PDF bytes held in memory.
///
/// The bytes are handed to pdfium directly; no temporary file is written.
pub async fn convert_from_bytes(bytes: &[u8], config: &OcrConfig) -> Result<OcrOutput, OcrError> {
    convert(InputSource::bytes("<memory>", bytes.to_vec()), config).await
}

/// Run with the input and output configured on `config` itself.
pub async fn run(config: &OcrConfig) -> Result<RunOutput, OcrError> {
    let source = config
        .input_source
        .clone()
        .ok_or_else(|| OcrError::InvalidConfig("no input source configured".into()))?;

    match config.output_target {
        OutputTarget::Collect => convert(source, config).await.map(RunOutput::Collected),
        OutputTarget::File(ref path) => {
            let report = convert_to_file(source, path, config).await?;
            Ok(RunOutput::Written {
                path: path.clone(),
                report,
            })
        }
    }
}

/// Read PDF metadata without rendering or recognising anything.
pub async fn inspect(input: impl Into<InputSource>) -> Result<DocumentMetadata, OcrError> {
    inspect_with_config(input, &OcrConfig::default()).await
}

/// Like [`inspect`], honouring the password, pdfium path and download
/// timeout from `config`.
pub async fn inspect_with_config(
    input: impl Into<InputSource>,
    config: &OcrConfig,
) -> Result<DocumentMetadata, OcrError> {
    let source = input.into();
    let resolved = input::resolve_input(&source, config.download_timeout_secs).await?;
    let password = config.password.clone();
    let lib_path = config.pdfium_lib_path.clone();

    tokio::task::spawn_blocking(move || {
        render::read_metadata(&resolved, password.as_deref(), lib_path.as_deref())
    })
    .await
    .map_err(|e| OcrError::Internal(format!("Metadata task panicked: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run the whole document into `sink` on the blocking pool.
async fn run_blocking<S>(
    pipeline: Pipeline,
    resolved: ResolvedInput,
    mut sink: S,
) -> Result<(RunReport, S), OcrError>
where
    S: PageSink + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let report = pipeline.run_document(&resolved, &mut sink)?;
        Ok((report, sink))
    })
    .await
    .map_err(|e| OcrError::Internal(format!("OCR task panicked: {}", e)))?
}
