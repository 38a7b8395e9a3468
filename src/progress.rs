//! Progress-callback trait for per-item job events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::FactoryConfigBuilder::progress_callback`] to receive
//! events as the coordinator resolves each item. The CLI uses it to drive a
//! terminal progress bar; a service embedding the library can forward the
//! same events to its own job tracker.
//!
//! # Example
//!
//! ```rust
//! use pdf_factory::{FactoryConfig, ItemReport, JobProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     resolved: AtomicUsize,
//! }
//!
//! impl JobProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total_items: usize, report: &ItemReport) {
//!         let done = self.resolved.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{}/{} resolved: {}", done, total_items, report.uri);
//!     }
//! }
//!
//! let config = FactoryConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { resolved: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{ItemReport, JobReport};
use std::path::Path;
use std::sync::Arc;

/// Called by the coordinator as it works through a job.
///
/// All methods have no-op defaults. Items are resolved one at a time, so
/// calls never overlap for a single job, but the trait is `Send + Sync` so a
/// callback can be shared between jobs running on different tasks.
pub trait JobProgressCallback: Send + Sync {
    /// Called once before the first item is resolved.
    fn on_job_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called before an item is resolved.
    ///
    /// # Arguments
    /// * `index`: 0-based position of the item in the job
    /// * `total_items`: number of items in the job
    /// * `uri`: the item's source URI
    fn on_item_start(&self, index: usize, total_items: usize, uri: &str) {
        let _ = (index, total_items, uri);
    }

    /// Called when an item has been resolved into the merge list.
    fn on_item_complete(&self, index: usize, total_items: usize, report: &ItemReport) {
        let _ = (index, total_items, report);
    }

    /// Called when an item fails. The job aborts right after this call.
    fn on_item_error(&self, index: usize, total_items: usize, error: &str) {
        let _ = (index, total_items, error);
    }

    /// Called once the merged output has been written.
    fn on_job_complete(&self, report: &JobReport) {
        let _ = report;
    }

    /// Called once when the job fails, after any `on_item_error`. Also fires
    /// for failures outside an item (loading, merging, installing).
    fn on_job_failed(&self, error: &str) {
        let _ = error;
    }

    /// Called instead of every other event when the final output already
    /// exists and the job does not ask for it to be overwritten.
    fn on_job_skipped(&self, output: &Path) {
        let _ = output;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FactoryConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Acquisition, JobStatus};
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        events: Mutex<Vec<String>>,
    }

    impl RecordingCallback {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl JobProgressCallback for RecordingCallback {
        fn on_job_start(&self, total_items: usize) {
            self.push(format!("start {total_items}"));
        }

        fn on_item_start(&self, index: usize, _total_items: usize, uri: &str) {
            self.push(format!("item {index} {uri}"));
        }

        fn on_item_complete(&self, index: usize, _total_items: usize, report: &ItemReport) {
            self.push(format!("done {index} {:?}", report.acquisition));
        }

        fn on_item_error(&self, index: usize, _total_items: usize, error: &str) {
            self.push(format!("error {index} {error}"));
        }

        fn on_job_complete(&self, report: &JobReport) {
            self.push(format!("complete {}", report.items.len()));
        }
    }

    fn item_report(index: usize) -> ItemReport {
        ItemReport {
            index,
            uri: format!("doc{index}.pdf"),
            acquisition: Acquisition::Copied,
            filled: false,
            published: None,
            duration_ms: 1,
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_job_start(2);
        cb.on_item_start(0, 2, "a.pdf");
        cb.on_item_complete(0, 2, &item_report(0));
        cb.on_item_error(1, 2, "boom");
        cb.on_job_failed("boom");
        cb.on_job_skipped(Path::new("out.pdf"));
    }

    #[test]
    fn recording_callback_receives_events_in_order() {
        let cb = RecordingCallback::default();
        cb.on_job_start(2);
        cb.on_item_start(0, 2, "doc0.pdf");
        cb.on_item_complete(0, 2, &item_report(0));
        cb.on_item_start(1, 2, "doc1.pdf");
        cb.on_item_error(1, 2, "not found");

        let events = cb.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start 2",
                "item 0 doc0.pdf",
                "done 0 Copied",
                "item 1 doc1.pdf",
                "error 1 not found",
            ]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(RecordingCallback::default());
        cb.on_job_complete(&JobReport {
            output: PathBuf::from("out.pdf"),
            status: JobStatus::Generated,
            items: vec![item_report(0)],
            total_duration_ms: 3,
        });
    }
}
