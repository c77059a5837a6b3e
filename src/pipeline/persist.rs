//! Save rasterised pages as `page_<n>.png`.
//!
//! Runs after rasterisation and before any OCR, so the images directory holds
//! every page even if recognition is interrupted.

use crate::error::RasterizeError;
use crate::pipeline::render::RenderedPage;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name for a 1-indexed page.
pub fn page_file_name(page_num: usize) -> String {
    format!("page_{page_num}.png")
}

/// Write every page to `dir`, creating it if needed. Existing files with the
/// same names are overwritten.
pub fn persist_pages(pages: &[RenderedPage], dir: &Path) -> Result<Vec<PathBuf>, RasterizeError> {
    std::fs::create_dir_all(dir).map_err(|source| RasterizeError::ImagesDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let path = dir.join(page_file_name(page.page_num));
        page.image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| RasterizeError::PersistFailed {
                page: page.page_num,
                path: path.clone(),
                source,
            })?;
        debug!("Saved page {} to {}", page.page_num, path.display());
        written.push(path);
    }

    info!("Saved {} page image(s) to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    #[test]
    fn writes_numbered_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let pages = vec![
            RenderedPage::new(1, DynamicImage::new_rgb8(4, 3)),
            RenderedPage::new(2, DynamicImage::new_luma8(2, 2)),
        ];

        let written = persist_pages(&pages, &images).unwrap();
        assert_eq!(written, vec![images.join("page_1.png"), images.join("page_2.png")]);

        let reloaded = image::open(&written[0]).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (4, 3));
    }

    #[test]
    fn unwritable_dir_is_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot be used as a directory.
        let err = persist_pages(&[], &file.path().join("sub")).unwrap_err();
        assert!(matches!(err, RasterizeError::ImagesDir { .. }), "got: {err:?}");
    }
}
