//! Progress-callback trait for extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages. Partitioning with the
//! vision model and figure captioning are the slow parts, so those report
//! per-page and per-image progress.
//!
//! # Example
//!
//! ```rust
//! use pdf2tables::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CaptionCounter {
//!     done: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CaptionCounter {
//!     fn on_image_captioned(&self, index: usize, total: usize, _caption_len: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("captioned {}/{}", index, total);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CaptionCounter { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Partition,
    Clean,
    Caption,
    Chunk,
    Tables,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Partition => "Partitioning",
            Stage::Clean => "Cleaning",
            Stage::Caption => "Captioning",
            Stage::Chunk => "Chunking",
            Stage::Tables => "Tables",
        })
    }
}

/// Called by the extraction pipeline as it runs.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after each page has been turned into elements.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages in the document
    /// * `elements`    — elements found on this page
    fn on_page_partitioned(&self, page_num: usize, total_pages: usize, elements: usize) {
        let _ = (page_num, total_pages, elements);
    }

    /// Called before the captioning loop with the number of figures that
    /// passed the size gate.
    fn on_captioning_start(&self, total: usize) {
        let _ = total;
    }

    /// Called after each figure caption is received.
    ///
    /// # Arguments
    /// * `index`       — 1-indexed position among the gated figures
    /// * `total`       — gated figures
    /// * `caption_len` — byte length of the caption
    fn on_image_captioned(&self, index: usize, total: usize, caption_len: usize) {
        let _ = (index, total, caption_len);
    }

    /// Called once when the run has finished.
    fn on_extraction_complete(&self, records: usize, tables: usize) {
        let _ = (records, tables);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<Stage>>,
        pages: AtomicUsize,
        captions: AtomicUsize,
    }

    impl ExtractionProgressCallback for Recorder {
        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_page_partitioned(&self, _page_num: usize, _total: usize, _elements: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_captioned(&self, _index: usize, _total: usize, _len: usize) {
            self.captions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(Stage::Partition);
        cb.on_page_partitioned(1, 3, 12);
        cb.on_captioning_start(2);
        cb.on_image_captioned(1, 2, 80);
        cb.on_extraction_complete(4, 1);
    }

    #[test]
    fn recorder_receives_events() {
        let r = Recorder::default();
        r.on_stage(Stage::Partition);
        r.on_page_partitioned(1, 2, 5);
        r.on_page_partitioned(2, 2, 7);
        r.on_stage(Stage::Caption);
        r.on_image_captioned(1, 1, 42);

        assert_eq!(*r.stages.lock().unwrap(), vec![Stage::Partition, Stage::Caption]);
        assert_eq!(r.pages.load(Ordering::SeqCst), 2);
        assert_eq!(r.captions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ExtractionProgressCallback>();
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage(Stage::Tables);
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::Caption.to_string(), "Captioning");
    }
}
