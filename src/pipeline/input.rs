//! Input resolution: turn an [`InputSource`] into something pdfium can open.
//!
//! Local files are opened in place, URLs are downloaded into a `TempDir` that
//! lives as long as the [`ResolvedInput`], and in-memory bytes are handed to
//! pdfium directly. Every source is checked for the `%PDF` magic bytes here,
//! before rasterisation, so a wrong upload fails as a caller error rather
//! than as a pdfium parse failure.

use crate::config::InputSource;
use crate::error::OcrError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A document ready to be handed to the rasterizer.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// PDF bytes held in memory.
    Memory { name: String, data: Arc<[u8]> },
}

impl ResolvedInput {
    /// Path on disk, if the document lives in a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedInput::Local(p) => Some(p),
            ResolvedInput::Downloaded { path, .. } => Some(path),
            ResolvedInput::Memory { .. } => None,
        }
    }

    /// Label for logs and error messages.
    pub fn name(&self) -> String {
        match self {
            ResolvedInput::Local(p) | ResolvedInput::Downloaded { path: p, .. } => {
                p.display().to_string()
            }
            ResolvedInput::Memory { name, .. } => name.clone(),
        }
    }
}

impl std::fmt::Debug for ResolvedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedInput::Local(p) => f.debug_tuple("Local").field(p).finish(),
            ResolvedInput::Downloaded { path, .. } => {
                f.debug_struct("Downloaded").field("path", path).finish()
            }
            ResolvedInput::Memory { name, data } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a source to a local file or an in-memory buffer.
///
/// URLs are downloaded; local files and byte buffers are validated without
/// copying.
pub async fn resolve_input(
    source: &InputSource,
    timeout_secs: u64,
) -> Result<ResolvedInput, OcrError> {
    match source {
        InputSource::Url(url) => download_url(url, timeout_secs).await,
        _ => resolve_local(source),
    }
}

/// Resolve a source that needs no network access.
///
/// URLs are rejected with [`OcrError::InvalidInput`]; use [`resolve_input`]
/// for those.
pub fn resolve_local(source: &InputSource) -> Result<ResolvedInput, OcrError> {
    match source {
        InputSource::Path(path) => resolve_path(path),
        InputSource::Bytes { name, data } => {
            check_magic(data, name)?;
            debug!("Resolved in-memory PDF '{}' ({} bytes)", name, data.len());
            Ok(ResolvedInput::Memory {
                name: name.clone(),
                data: Arc::clone(data),
            })
        }
        InputSource::Url(url) => Err(OcrError::InvalidInput { input: url.clone() }),
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_path(path: &Path) -> Result<ResolvedInput, OcrError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(OcrError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(OcrError::InvalidInput {
            input: path.display().to_string(),
        });
    }

    match std::fs::File::open(&path) {
        Ok(f) => {
            let mut magic = Vec::with_capacity(PDF_MAGIC.len());
            f.take(PDF_MAGIC.len() as u64)
                .read_to_end(&mut magic)
                .map_err(|_| OcrError::FileNotFound { path: path.clone() })?;
            check_magic(&magic, &path.display().to_string())?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(OcrError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(OcrError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Fail with [`OcrError::NotAPdf`] unless `bytes` starts with `%PDF`.
pub fn check_magic(bytes: &[u8], source_name: &str) -> Result<(), OcrError> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(OcrError::NotAPdf {
            source_name: source_name.to_string(),
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        })
    }
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, OcrError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| OcrError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            OcrError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            OcrError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(OcrError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = filename_from_url(url);

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            OcrError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            OcrError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    check_magic(&bytes, url)?;

    let temp_dir = TempDir::new().map_err(|e| OcrError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);
    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| OcrError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.org/a/scan.pdf"), "scan.pdf");
        assert_eq!(filename_from_url("https://x.org/download/"), "downloaded.pdf");
        assert_eq!(filename_from_url("not a url"), "downloaded.pdf");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local(&InputSource::Path("/no/such/file.pdf".into())).unwrap_err();
        assert!(matches!(err, OcrError::FileNotFound { .. }), "got: {err:?}");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn text_file_is_not_a_pdf() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();
        let err = resolve_local(&InputSource::Path(tmp.path().to_path_buf())).unwrap_err();
        match err {
            OcrError::NotAPdf { magic, .. } => assert_eq!(magic, b"hell".to_vec()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_not_a_pdf() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = resolve_local(&InputSource::Path(tmp.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, OcrError::NotAPdf { .. }), "got: {err:?}");
    }

    #[test]
    fn pdf_header_resolves_locally() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").unwrap();
        let resolved = resolve_local(&InputSource::Path(tmp.path().to_path_buf())).unwrap();
        assert_eq!(resolved.path(), Some(tmp.path()));
    }

    #[test]
    fn directory_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_local(&InputSource::Path(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput { .. }), "got: {err:?}");
    }

    #[test]
    fn bytes_are_checked_without_copying() {
        let ok = resolve_local(&InputSource::bytes("upload.pdf", b"%PDF-1.4".to_vec())).unwrap();
        assert!(ok.path().is_none());
        assert_eq!(ok.name(), "upload.pdf");

        let err = resolve_local(&InputSource::bytes("upload.txt", b"PK\x03\x04".to_vec()))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn urls_need_the_async_resolver() {
        let err = resolve_local(&InputSource::Url("https://x.org/a.pdf".into())).unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput { .. }));
    }
}
