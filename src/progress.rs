//! Progress-callback trait for per-item OCR events.
//!
//! Inject an [`Arc<dyn OcrProgressCallback>`] via
//! [`crate::config::OcrConfigBuilder::progress_callback`] to be told when a
//! batch starts, when each page or file is sent, and how it ended. The CLI
//! drives its progress bar from these events; library callers can forward
//! them to a log, a channel, or a UI.
//!
//! Items are processed strictly one after another, so events for a batch
//! arrive in order: `on_batch_start`, then `on_item_start` followed by either
//! `on_item_complete` or `on_item_error` for each item, then
//! `on_batch_complete`.

use std::sync::Arc;

/// Called by [`crate::aggregate::OcrPipeline`] as it works through a batch.
///
/// All methods default to no-ops so implementors override only what they need.
pub trait OcrProgressCallback: Send + Sync {
    /// Called once before the first item is sent.
    fn on_batch_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called just before the request for an item is sent.
    ///
    /// `index` is 1-based.
    fn on_item_start(&self, index: usize, total_items: usize) {
        let _ = (index, total_items);
    }

    /// Called when the remote model answered without an error.
    fn on_item_complete(&self, index: usize, total_items: usize) {
        let _ = (index, total_items);
    }

    /// Called when the request for an item failed.
    fn on_item_error(&self, index: usize, total_items: usize, error: &str) {
        let _ = (index, total_items, error);
    }

    /// Called once after every item has been attempted.
    fn on_batch_complete(&self, total_items: usize, success_count: usize) {
        let _ = (total_items, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl OcrProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::OcrConfig`].
pub type ProgressCallback = Arc<dyn OcrProgressCallback>;
