//! Framework-agnostic upload handler.
//!
//! [`RequestHandler::handle`] takes the fields of a multipart request, runs
//! the PDF found in the `file` field through the pipeline and returns a
//! status code plus a JSON body. Wiring it into a particular HTTP framework
//! is left to the caller: parse the multipart body into [`UploadField`]s,
//! call `handle`, serialise [`HandlerResponse::body`] with the returned
//! status.

use crate::config::{InputSource, OcrConfig};
use crate::convert::convert;
use crate::error::OcrError;
use crate::output::TextPayload;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Name of the multipart field that must carry the PDF.
pub const FILE_FIELD: &str = "file";

/// One field of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadField {
    pub name: String,
    /// Client-side file name, if the field was a file part.
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadField {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// JSON body of a handler response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// `{"texts": [...]}` or `{"text": "..."}`.
    Text(TextPayload),
    /// `{"error": "..."}`.
    Error { error: String },
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl HandlerResponse {
    pub fn ok(payload: TextPayload) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Text(payload),
        }
    }

    pub fn from_error(err: &OcrError) -> Self {
        Self {
            status: err.status_code(),
            body: ResponseBody::Error {
                error: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body serialised as a JSON string.
    pub fn body_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Runs uploaded PDFs through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    config: OcrConfig,
}

impl RequestHandler {
    /// Validates `config` up front so a bad deployment fails at start-up
    /// rather than on the first request.
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Handle one upload request.
    ///
    /// * no `file` field → 400, nothing processed
    /// * input errors (not a PDF, …) → 400
    /// * any other failure → 500
    /// * success → 200 with one string per page, or a single joined string
    ///   when `merge_pages` is set
    pub async fn handle(&self, fields: &[UploadField]) -> HandlerResponse {
        let Some(upload) = fields.iter().find(|f| f.name == FILE_FIELD) else {
            let err = OcrError::MissingUpload {
                field: FILE_FIELD.to_string(),
            };
            warn!("Rejected request: {}", err);
            return HandlerResponse::from_error(&err);
        };

        let name = upload
            .filename
            .clone()
            .unwrap_or_else(|| FILE_FIELD.to_string());
        info!("Processing upload '{}' ({} bytes)", name, upload.bytes.len());

        let source = InputSource::bytes(name, upload.bytes.clone());
        match convert(source, &self.config).await {
            Ok(output) => HandlerResponse::ok(output.payload(self.config.merge_pages)),
            Err(e) => {
                if e.is_input_error() {
                    warn!("Rejected upload: {}", e);
                } else {
                    error!("Upload processing failed: {}", e);
                }
                HandlerResponse::from_error(&e)
            }
        }
    }
}
