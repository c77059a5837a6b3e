//! Output sinks: where recognised page text ends up.
//!
//! The pipeline emits one call per page, in page order. [`FileSink`] appends
//! labelled blocks to a text file; [`AggregatingSink`] keeps the pages in
//! memory for a JSON response.

use crate::error::SinkError;
use crate::output::TextPayload;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Receives the text of each page, in page order.
pub trait PageSink {
    /// Accept the text of a 1-indexed page.
    fn emit(&mut self, page_num: usize, text: &str) -> Result<(), SinkError>;
}

impl<S: PageSink + ?Sized> PageSink for &mut S {
    fn emit(&mut self, page_num: usize, text: &str) -> Result<(), SinkError> {
        (**self).emit(page_num, text)
    }
}

impl<S: PageSink + ?Sized> PageSink for Box<S> {
    fn emit(&mut self, page_num: usize, text: &str) -> Result<(), SinkError> {
        (**self).emit(page_num, text)
    }
}

impl PageSink for Vec<String> {
    fn emit(&mut self, _page_num: usize, text: &str) -> Result<(), SinkError> {
        self.push(text.to_string());
        Ok(())
    }
}

/// Render one page block as written to the output file.
pub fn format_page_block(page_num: usize, text: &str) -> String {
    format!("Image {page_num} - Full Page:\n{}\n\n", text.trim())
}

/// Appends `Image <n> - Full Page:` blocks to a text file.
///
/// Creating the sink deletes any file left by a previous run. Each page opens
/// the file in append mode and closes it again before returning.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();

        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed previous output {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(SinkError::Remove { path, source }),
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSink for FileSink {
    fn emit(&mut self, page_num: usize, text: &str) -> Result<(), SinkError> {
        let write_err = |source| SinkError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(format_page_block(page_num, text).as_bytes())
            .map_err(write_err)?;
        file.flush().map_err(write_err)
    }
}

/// Collects page texts in memory for a JSON response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregatingSink {
    texts: Vec<String>,
}

impl AggregatingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn into_texts(self) -> Vec<String> {
        self.texts
    }

    /// `{"texts": [...]}` or, with `merge_pages`, `{"text": "..."}`.
    pub fn into_payload(self, merge_pages: bool) -> TextPayload {
        TextPayload::from_texts(self.texts, merge_pages)
    }
}

impl PageSink for AggregatingSink {
    fn emit(&mut self, _page_num: usize, text: &str) -> Result<(), SinkError> {
        self.texts.push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_block_format() {
        assert_eq!(
            format_page_block(3, "  नमस्ते\nworld \n\n"),
            "Image 3 - Full Page:\nनमस्ते\nworld\n\n"
        );
        assert_eq!(format_page_block(1, ""), "Image 1 - Full Page:\n\n\n");
    }

    #[test]
    fn file_sink_appends_blocks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("output.txt");

        let mut sink = FileSink::create(&path).unwrap();
        sink.emit(1, "first\n").unwrap();
        sink.emit(2, "").unwrap();
        sink.emit(3, " third ").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Image 1 - Full Page:\nfirst\n\nImage 2 - Full Page:\n\n\nImage 3 - Full Page:\nthird\n\n"
        );
    }

    #[test]
    fn rerun_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");

        for _ in 0..2 {
            let mut sink = FileSink::create(&path).unwrap();
            sink.emit(1, "same").unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Image 1 - Full Page:\nsame\n\n");
    }

    #[test]
    fn file_sink_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // The target is a directory, so opening it for append fails.
        let mut sink = FileSink {
            path: dir.path().to_path_buf(),
        };
        let err = sink.emit(1, "x").unwrap_err();
        assert!(matches!(err, SinkError::Write { .. }), "got: {err:?}");
    }

    #[test]
    fn aggregating_sink_payloads() {
        let mut sink = AggregatingSink::new();
        for (n, t) in ["a", "b", "c"].iter().enumerate() {
            sink.emit(n + 1, t).unwrap();
        }
        assert_eq!(sink.texts(), ["a", "b", "c"]);
        assert_eq!(
            sink.clone().into_payload(true),
            TextPayload::Merged {
                text: "a\nb\nc".into()
            }
        );
        assert_eq!(sink.into_texts().len(), 3);
    }

    #[test]
    fn vec_and_boxed_sinks() {
        let mut v: Vec<String> = Vec::new();
        {
            let mut boxed: Box<dyn PageSink + '_> = Box::new(&mut v);
            boxed.emit(1, "x").unwrap();
        }
        assert_eq!(v, vec!["x".to_string()]);
    }
}
