//! Job-scoped scratch storage for intermediate documents.
//!
//! One [`ScratchArea`] is created per job run. Every acquired, rendered or
//! filled document lives in it until the merge, and the whole directory is
//! removed when the job ends. [`ScratchArea::close`] removes it and reports
//! failures; if the area is dropped instead (early return, panic), the
//! underlying [`TempDir`] still removes it on drop.

use crate::error::FactoryError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const DIR_PREFIX: &str = "pdf-factory-";

/// Scratch directory owned by one job run.
#[derive(Debug)]
pub struct ScratchArea {
    dir: TempDir,
}

impl ScratchArea {
    /// Create a scratch directory under `parent`, or the system temp dir.
    pub fn create(parent: Option<&Path>) -> Result<Self, FactoryError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(DIR_PREFIX);
        let dir = match parent {
            Some(p) => builder.tempdir_in(p),
            None => builder.tempdir(),
        }
        .map_err(|e| FactoryError::Internal(format!("Failed to create scratch area: {e}")))?;

        debug!("Created scratch area {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve a new, empty `.pdf` file in the scratch area.
    ///
    /// The file exists on return so concurrent reservations never collide,
    /// and it stays in place until the area is closed.
    pub fn new_document(&self) -> Result<PathBuf, FactoryError> {
        tempfile::Builder::new()
            .prefix("doc-")
            .suffix(".pdf")
            .tempfile_in(self.dir.path())
            .map_err(|e| FactoryError::Internal(format!("Failed to create scratch file: {e}")))?
            .into_temp_path()
            .keep()
            .map_err(|e| FactoryError::Internal(format!("Failed to keep scratch file: {}", e.error)))
    }

    /// Delete the scratch area and everything in it.
    pub fn close(self) -> Result<(), FactoryError> {
        let path = self.dir.path().to_path_buf();
        info!("Deleting scratch area '{}'", path.display());
        self.dir
            .close()
            .map_err(|source| FactoryError::CleanupFailed { path, source })
    }
}
