//! PDF rasterisation: render selected pages to `DynamicImage` via pdfium.
//!
//! Rendering is blocking and CPU-heavy. The async entry points in
//! [`crate::convert`] call into this module from `spawn_blocking`; nothing
//! here touches the tokio runtime.
//!
//! Scale is `dpi / 72` (PDF user space is 72 points per inch), with the
//! longest edge capped at `max_rendered_pixels`.

use crate::config::{OcrConfig, PageSelection};
use crate::error::{OcrError, RasterizeError};
use crate::output::DocumentMetadata;
use crate::pipeline::input::ResolvedInput;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One rasterised page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    pub image: DynamicImage,
}

impl RenderedPage {
    pub fn new(page_num: usize, image: DynamicImage) -> Self {
        Self { page_num, image }
    }
}

/// Bind to a pdfium library.
///
/// Search order: explicit `lib_path`, `PDFIUM_LIB_PATH` (file or directory),
/// the current working directory, then the system library path.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, OcrError> {
    let mut attempts: Vec<String> = Vec::new();

    let env_path = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    for candidate in lib_path.map(Path::to_path_buf).into_iter().chain(env_path) {
        let file = if candidate.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&candidate)
        } else {
            candidate
        };
        match Pdfium::bind_to_library(&file) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", file.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => attempts.push(format!("{}: {:?}", file.display(), e)),
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(e) => attempts.push(format!("{}: {:?}", local.display(), e)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(e) => {
            attempts.push(format!("system library: {:?}", e));
            Err(OcrError::PdfiumBindingFailed(attempts.join("; ")))
        }
    }
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    input: &'a ResolvedInput,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, RasterizeError> {
    let loaded = match input {
        ResolvedInput::Memory { data, .. } => pdfium.load_pdf_from_byte_slice(data, password),
        ResolvedInput::Local(path) | ResolvedInput::Downloaded { path, .. } => {
            pdfium.load_pdf_from_file(path, password)
        }
    };

    loaded.map_err(|e| {
        let source_name = input.name();
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                RasterizeError::WrongPassword { source_name }
            } else {
                RasterizeError::PasswordRequired { source_name }
            }
        } else {
            RasterizeError::CorruptPdf {
                source_name,
                detail: err_str,
            }
        }
    })
}

/// First page the caller asked for, for error reporting.
fn requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 1,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(1),
    }
}

/// Rasterise the selected pages of a resolved document, in page order.
///
/// Any failure aborts the whole document; no partial result is returned.
pub fn rasterize(input: &ResolvedInput, config: &OcrConfig) -> Result<Vec<RenderedPage>, OcrError> {
    let pdfium = bind_pdfium(config.pdfium_lib_path.as_deref())?;
    let document = load_document(&pdfium, input, config.password.as_deref())?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() && (total_pages > 0 || config.pages != PageSelection::All) {
        return Err(OcrError::PageOutOfRange {
            page: requested_page(&config.pages),
            total: total_pages,
        });
    }

    let max_px = config.max_rendered_pixels.min(i32::MAX as u32) as i32;
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(config.dpi as f32 / 72.0)
        .set_maximum_width(max_px)
        .set_maximum_height(max_px);

    let mut results = Vec::with_capacity(indices.len());

    for idx in indices {
        let page_num = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| RasterizeError::PageFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RasterizeError::PageFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px at {} DPI",
            page_num,
            image.width(),
            image.height(),
            config.dpi
        );

        results.push(RenderedPage::new(page_num, image));
    }

    Ok(results)
}

/// Read document metadata without rendering pages.
pub fn read_metadata(
    input: &ResolvedInput,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<DocumentMetadata, OcrError> {
    let pdfium = bind_pdfium(lib_path)?;
    let document = load_document(&pdfium, input, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
