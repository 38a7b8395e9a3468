//! Error types for the pdf-factory library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`FactoryError`]: **fatal** for the job, such as a missing required
//!   field or an output path that escapes the output root.
//!   Returned as `Err(FactoryError)` from [`crate::factory::generate`] after
//!   the scratch area has been removed and the callback has been informed.
//!
//! * [`ToolError`]: a failure reported by an external PDF utility (the form
//!   filler or the concatenator). It is wrapped by the job-level variant that
//!   names the step ([`FactoryError::FillFailed`], [`FactoryError::ConcatFailed`]).
//!
//! Notification and scratch-cleanup failures are also described here, but
//! the coordinator only logs them: they never turn a finished job into a
//! failed one.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-factory library.
#[derive(Debug, Error)]
pub enum FactoryError {
    // ── Job configuration ─────────────────────────────────────────────────
    /// A required field is absent from the job descriptor.
    #[error("Job descriptor is missing required value '{field}'")]
    MissingField { field: String },

    /// The job descriptor is not valid JSON or has values of the wrong type.
    #[error("Invalid job descriptor: {reason}")]
    InvalidJob { reason: String },

    /// The job descriptor could not be read or downloaded.
    #[error("Cannot load job descriptor '{source_uri}': {reason}")]
    JobLoadFailed { source_uri: String, reason: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Classification ────────────────────────────────────────────────────
    /// The HEAD probe of a remote source failed.
    #[error("Cannot probe '{uri}': {reason}")]
    ProbeFailed { uri: String, reason: String },

    /// Local source does not exist.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The source has a content type no acquisition strategy handles.
    #[error("Unsupported content type '{content_type}' for '{uri}'")]
    UnsupportedType { uri: String, content_type: String },

    /// The source is itself a job descriptor; nested jobs are not processed.
    #[error("'{uri}' is a job descriptor; nested jobs are not supported")]
    NestedJob { uri: String },

    // ── Acquisition ───────────────────────────────────────────────────────
    /// GET of a remote document failed or returned a non-success status.
    #[error("Failed to download '{uri}': {reason}\nCheck your internet connection.")]
    FetchFailed { uri: String, reason: String },

    /// Copying a document into or out of the scratch area failed.
    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTML renderer did not finish within its budget and was killed.
    #[error("Renderer timed out after {elapsed_ms}ms on '{uri}'\nIncrease --render-max-polls.")]
    RenderTimeout { uri: String, elapsed_ms: u64 },

    /// The HTML renderer could not be started or exited unsuccessfully.
    #[error("Renderer failed on '{uri}': {reason}")]
    RenderFailed { uri: String, reason: String },

    /// The form filler rejected the document or the data.
    #[error("Failed to fill form fields of '{path}': {source}")]
    FillFailed {
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    // ── Output ────────────────────────────────────────────────────────────
    /// An output path resolves outside the configured output root.
    #[error("Output path '{path}' escapes the output root '{root}'")]
    PathEscape { path: String, root: PathBuf },

    /// A stale output could not be removed before regeneration, or the
    /// scratch area could not be deleted.
    #[error("Failed to remove '{path}': {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Concatenation of the resolved documents failed.
    #[error("Failed to merge documents: {source}")]
    ConcatFailed {
        #[source]
        source: ToolError,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Notification ──────────────────────────────────────────────────────
    /// The completion webhook could not be reached.
    #[error("Cannot post to callback '{url}': {reason}")]
    NotifyFailed { url: String, reason: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FactoryError {
    /// Whether the error comes from the job descriptor rather than from
    /// processing one of its items.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            FactoryError::MissingField { .. }
                | FactoryError::InvalidJob { .. }
                | FactoryError::JobLoadFailed { .. }
                | FactoryError::InvalidConfig(_)
        )
    }
}

/// A failure reported by an external PDF utility.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The binary could not be started.
    #[error("cannot run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The utility ran and exited unsuccessfully.
    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    /// Preparing the utility's input files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reported by a non-process toolkit implementation.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display_names_the_path() {
        let e = FactoryError::MissingField {
            field: "items[1].uri".into(),
        };
        assert!(e.to_string().contains("items[1].uri"), "got: {e}");
        assert!(e.is_config_error());
    }

    #[test]
    fn path_escape_display() {
        let e = FactoryError::PathEscape {
            path: "../../etc/passwd".into(),
            root: PathBuf::from("/srv/outputs"),
        };
        let msg = e.to_string();
        assert!(msg.contains("../../etc/passwd"));
        assert!(msg.contains("/srv/outputs"));
        assert!(!e.is_config_error());
    }

    #[test]
    fn render_timeout_display() {
        let e = FactoryError::RenderTimeout {
            uri: "https://example.com/page.html".into(),
            elapsed_ms: 120_000,
        };
        assert!(e.to_string().contains("120000ms"));
    }

    #[test]
    fn fill_failed_keeps_tool_source() {
        use std::error::Error as _;
        let e = FactoryError::FillFailed {
            path: PathBuf::from("/tmp/a.pdf"),
            source: ToolError::Exit {
                program: "pdftk".into(),
                status: "exit status: 1".into(),
                stderr: "Error: Failed to open form data file".into(),
            },
        };
        let source = e.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("pdftk"), "got: {source}");
    }
}
