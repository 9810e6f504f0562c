//! Prompts sent alongside each image.
//!
//! The remote model does the actual reading; the prompt only tells it what
//! to return. Callers override the default through
//! [`crate::config::OcrConfig::prompt`] or per call.

/// Default prompt for pages, files and batches.
pub const DEFAULT_PROMPT: &str = "OCR this image and extract all text.";

/// Alternative prompt for form-like single images where a structured
/// summary is more useful than a verbatim transcript.
pub const SUMMARIZE_FIELDS_PROMPT: &str = "OCR this image and summarize key fields.";

/// Annotate a prompt with the page position inside a multi-page batch.
///
/// `page` is 1-based. The model sees e.g.
/// `"OCR this image and extract all text. (Page 2/5)"`.
pub fn page_annotated(prompt: &str, page: usize, total: usize) -> String {
    format!("{prompt} (Page {page}/{total})")
}
