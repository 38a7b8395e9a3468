//! Result types describing a finished job.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of a job run, returned by [`crate::factory::generate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    /// Final merged document, resolved under the output root.
    pub output: PathBuf,
    /// Whether the output was produced by this run.
    pub status: JobStatus,
    /// One entry per item, in job order. Empty when the job was up to date.
    pub items: Vec<ItemReport>,
    /// Wall-clock time of the whole run.
    pub total_duration_ms: u64,
}

/// Outcome of a successful job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Items were resolved and merged into the output.
    Generated,
    /// The output already existed and the job did not ask to overwrite it.
    UpToDate,
}

/// How a single item was resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    /// 0-based position in the job.
    pub index: usize,
    /// Source URI as written in the job.
    pub uri: String,
    pub acquisition: Acquisition,
    /// Form fields were filled from the item's effective data.
    pub filled: bool,
    /// Where the resolved document was published, if the item names an output.
    pub published: Option<PathBuf>,
    pub duration_ms: u64,
}

/// The acquisition strategy that produced an item's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquisition {
    /// Downloaded from a remote `application/pdf` source.
    Fetched,
    /// Copied from a local PDF.
    Copied,
    /// Rendered from HTML by the external renderer.
    Rendered,
    /// Copied from the item's existing output; nothing was re-acquired.
    Reused,
}

impl Acquisition {
    /// Whether the form filler may be applied to a document acquired this way.
    ///
    /// Rendered HTML carries no form fields, and a reused output is merged
    /// exactly as it was stored.
    pub fn is_fillable(self) -> bool {
        matches!(self, Acquisition::Fetched | Acquisition::Copied)
    }
}
