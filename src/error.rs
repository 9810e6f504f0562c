//! Error types for the edgequake-ocr library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`OcrError`]: **Fatal** for the current call: the input cannot be
//!   read, no PDF backend exists, the API is not configured, or an image
//!   could not be encoded while assembling a request. Returned as
//!   `Err(OcrError)` from the pipeline entry points.
//!
//! * [`RemoteApiError`]: **Per item**: the model endpoint was unreachable or
//!   answered with a non-2xx status. Stored inside
//!   [`crate::output::OcrResult`] so one bad page never aborts a batch.
//!
//! * [`ResponseShapeError`]: the endpoint answered, but not with the
//!   chat-completions shape. Recovered locally by
//!   [`crate::pipeline::extract::extract_text`] and never propagated.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-ocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// Disallowed extension, or no PDF rasterisation backend available.
    #[error("Unsupported format: {detail}")]
    UnsupportedFormat { detail: String },

    /// Upload exceeds the configured size cap.
    #[error("File too large ({size} bytes). Maximum size is {}MB", .max / (1024 * 1024))]
    FileTooLarge { size: u64, max: u64 },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The file exists but could not be decoded as an image.
    #[error("Failed to process image '{path}': {detail}")]
    ImageDecode { path: PathBuf, detail: String },

    /// JPEG encoding of a normalised image failed.
    #[error("Image encoding failed: {0}")]
    ImageEncode(String),

    /// The rasterisation backend failed on a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Configuration errors ──────────────────────────────────────────────
    /// Endpoint URL or bearer key is missing.
    #[error("OCR API is not configured. {hint}")]
    ApiNotConfigured { hint: String },

    /// A model profile id that the registry does not know.
    #[error("Invalid model_id: {id}. Available models: {}", .available.join(", "))]
    UnknownModel { id: String, available: Vec<String> },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A captured failure of one call to the remote model.
///
/// Serialises as `{"error": "...", "status_code": 503}` (or `null` when the
/// request never produced a response), the same object the inbound JSON
/// contract embeds in place of a model response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{error}")]
pub struct RemoteApiError {
    pub error: String,
    pub status_code: Option<u16>,
}

impl RemoteApiError {
    pub fn new(error: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            error: error.into(),
            status_code,
        }
    }

    /// A failure that never reached an HTTP status (DNS, connect, timeout).
    pub fn network(error: impl Into<String>) -> Self {
        Self::new(error, None)
    }
}

/// The response JSON did not have the `choices[0].message.content` shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseShapeError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("'choices' is empty")]
    EmptyChoices,

    #[error("'{0}' is not a string")]
    NotAString(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_reports_megabytes() {
        let e = OcrError::FileTooLarge {
            size: 20 * 1024 * 1024,
            max: 16 * 1024 * 1024,
        };
        assert!(e.to_string().contains("16MB"), "got: {e}");
    }

    #[test]
    fn unknown_model_lists_available() {
        let e = OcrError::UnknownModel {
            id: "gpt-x".into(),
            available: vec!["qwen2-vl-32b".into(), "qwen2.5-vl-7b".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("gpt-x"));
        assert!(msg.contains("qwen2-vl-32b, qwen2.5-vl-7b"));
    }

    #[test]
    fn remote_error_serialises_null_status() {
        let e = RemoteApiError::network("connection refused");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["error"], "connection refused");
        assert!(v["status_code"].is_null());
    }

    #[test]
    fn remote_error_serialises_status() {
        let e = RemoteApiError::new("503 Service Unavailable", Some(503));
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["status_code"], 503);
    }
}
