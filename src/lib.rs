//! # pdf-factory
//!
//! Assemble one PDF from a JSON job: fetch, copy or render each item,
//! optionally fill its form fields, then concatenate everything in order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! job.json
//!  │
//!  ├─ 1. Load      local path or http(s):// URI, validated up front
//!  ├─ 2. Check     final output already there and no overwrite? done
//!  ├─ 3. Resolve   per item, in order:
//!  │     ├─ reuse its existing output, or
//!  │     ├─ classify (HEAD content type / leading bytes) and
//!  │     │   fetch a PDF, copy a local PDF, or render HTML (wkhtmltopdf)
//!  │     ├─ fill form fields (pdftk) from job + item data
//!  │     └─ publish to the item's own output path
//!  ├─ 4. Merge     concatenate in job order (pdftk), move into place
//!  └─ 5. Notify    POST {"success": bool} to the job's callback
//! ```
//!
//! Every output path is resolved under one output root and rejected if it
//! escapes it. All intermediate files live in a per-job scratch directory
//! that is removed when the job ends, whether it succeeded or not.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_factory::{generate_from_source, FactoryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FactoryConfig::builder()
//!         .output_root("/srv/pdf/outputs")
//!         .build()?;
//!     let report = generate_from_source("jobs/welcome-pack.json", &config).await?;
//!     println!("{} ({} items)", report.output.display(), report.items.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-factory` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-factory = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Tools
//!
//! HTML items need `wkhtmltopdf`; form filling and merging use `pdftk` unless
//! a [`PdfToolkit`] is injected through [`FactoryConfigBuilder::toolkit`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod factory;
pub mod job;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod toolkit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FactoryConfig, FactoryConfigBuilder, FillFailurePolicy};
pub use error::{FactoryError, ToolError};
pub use factory::{generate, generate_from_source, generate_sync};
pub use job::{load_job, FieldData, Item, Job, JobDescriptor};
pub use output::{Acquisition, ItemReport, JobReport, JobStatus};
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use toolkit::{PdfToolkit, Pdftk};
