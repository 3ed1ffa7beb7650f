//! UI-event callback trait for processing runs.
//!
//! Inject an [`Arc<dyn ProcessingCallback>`] via
//! [`crate::process::Processor::with_callback`] to receive events as the run
//! moves through its states. The CLI renders them as a progress bar; a GUI
//! would toggle its process button, fill the results area and show the
//! gallery from the same events.
//!
//! # Example
//!
//! ```rust
//! use notes2docx::ProcessingCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl ProcessingCallback for CountingCallback {
//!     fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages} failed: {error}");
//!     }
//! }
//! ```

use crate::process::ProcessingState;
use crate::session::PageImage;
use std::sync::Arc;

/// Called by the orchestrator as a run progresses.
///
/// All methods have default no-op implementations so implementors only
/// override what they care about.
pub trait ProcessingCallback: Send + Sync {
    /// A message for the user that is not an error (e.g. no file selected).
    fn on_prompt(&self, message: &str) {
        let _ = message;
    }

    /// The run entered a new state.
    fn on_state_change(&self, state: &ProcessingState) {
        let _ = state;
    }

    /// Every page has been rasterized; the gallery can be shown.
    fn on_pages_rasterized(&self, pages: &[PageImage]) {
        let _ = pages;
    }

    /// Called just before a page's request is sent.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// A page was transcribed.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text: &str) {
        let _ = (page_num, total_pages, text);
    }

    /// A page's request failed; the batch continues.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Every page has a result.
    fn on_batch_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }

    /// The run aborted with a batch-fatal error.
    fn on_batch_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopCallback;

impl ProcessingCallback for NoopCallback {}

/// Convenience alias for the shared callback handle.
pub type Callback = Arc<dyn ProcessingCallback>;
