//! Pipeline stages for resolving one job item into a PDF.
//!
//! Each submodule implements one step. [`resolve`] strings them together for
//! a single item; [`crate::factory`] runs it over every item of a job.
//!
//! ## Data Flow
//!
//! ```text
//! item ──▶ publish ──▶ classify ──▶ acquire / render ──▶ fill ──▶ publish
//!        (existing?)   (HEAD/magic)   (scratch copy)     (toolkit)  (output root)
//! ```
//!
//! 1. [`input`]: read job descriptors, build the shared HTTP client
//! 2. [`classify`]: content kind of a source (document, hypertext, job or other)
//! 3. [`acquire`]: download, copy, or reuse a PDF into the scratch area
//! 4. [`render`]: run the HTML renderer with a bounded wait
//! 5. [`publish`]: output-root containment and copies to published paths
//! 6. [`scratch`]: the job-scoped temporary directory
//! 7. [`resolve`]: the per-item state machine

pub mod acquire;
pub mod classify;
pub mod input;
pub mod publish;
pub mod render;
pub mod resolve;
pub mod scratch;

use crate::config::FactoryConfig;
use crate::output::Acquisition;
use crate::toolkit::PdfToolkit;
use scratch::ScratchArea;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a stage needs for one job run.
pub struct JobContext<'a> {
    pub config: &'a FactoryConfig,
    pub client: reqwest::Client,
    pub scratch: &'a ScratchArea,
    pub toolkit: Arc<dyn PdfToolkit>,
}

/// An item's document in the scratch area, ready for merging.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    /// Scratch path of the final (possibly filled) document.
    pub path: PathBuf,
    pub acquisition: Acquisition,
    pub filled: bool,
    /// Set when this run copied the document to the item's output path.
    pub published: Option<PathBuf>,
}
