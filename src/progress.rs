//! Progress-callback trait for per-file and per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through the request. The CLI uses it to
//! drive its progress bar; a host could forward the same events anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdf_to_images::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, file_index: usize, page_num: usize, total_pages: usize, bytes: usize) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("file {file_index}: page {page_num}/{total_pages} ({bytes} bytes)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each file and page.
///
/// Page events fire on the blocking render thread, so implementations must
/// be `Send + Sync`. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after parameters validated.
    fn on_conversion_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file's bytes are resolved.
    ///
    /// * `file_index` — 1-indexed position in the request
    fn on_file_start(&self, file_index: usize, filename: &str) {
        let _ = (file_index, filename);
    }

    /// Called once the document is open and its page count known.
    fn on_file_opened(&self, file_index: usize, total_pages: usize) {
        let _ = (file_index, total_pages);
    }

    /// Called after each page image is encoded.
    ///
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages in this file
    /// * `bytes`       — encoded image size
    fn on_page_rendered(&self, file_index: usize, page_num: usize, total_pages: usize, bytes: usize) {
        let _ = (file_index, page_num, total_pages, bytes);
    }

    /// Called when a file is skipped.
    fn on_file_error(&self, file_index: usize, error: &str) {
        let _ = (file_index, error);
    }

    /// Called once after every file has been attempted.
    fn on_conversion_complete(&self, total_images: usize, failed_files: usize) {
        let _ = (total_images, failed_files);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        files: AtomicUsize,
        pages: AtomicUsize,
        errors: AtomicUsize,
        images: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_file_start(&self, _file_index: usize, _filename: &str) {
            self.files.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_rendered(&self, _f: usize, _p: usize, _t: usize, _b: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _file_index: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, total_images: usize, _failed: usize) {
            self.images.store(total_images, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(2);
        cb.on_file_start(1, "a.pdf");
        cb.on_file_opened(1, 3);
        cb.on_page_rendered(1, 1, 3, 1024);
        cb.on_file_error(2, "not found");
        cb.on_conversion_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = TrackingCallback::default();
        t.on_file_start(1, "a.pdf");
        t.on_page_rendered(1, 1, 2, 10);
        t.on_page_rendered(1, 2, 2, 10);
        t.on_file_start(2, "b.pdf");
        t.on_file_error(2, "HTTP 404");
        t.on_conversion_complete(2, 1);

        assert_eq!(t.files.load(Ordering::SeqCst), 2);
        assert_eq!(t.pages.load(Ordering::SeqCst), 2);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.images.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(1);
        cb.on_file_opened(1, 10);
    }
}
