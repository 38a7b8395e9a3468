//! Acquisition strategies that bring a PDF into the scratch area.
//!
//! Rendering HTML is the fourth strategy and lives in
//! [`crate::pipeline::render`] because it drives an external process.

use crate::error::FactoryError;
use crate::pipeline::scratch::ScratchArea;
use std::path::{Path, PathBuf};
use tracing::info;

/// Download a remote PDF into a new scratch document.
pub async fn fetch_remote(
    uri: &str,
    client: &reqwest::Client,
    scratch: &ScratchArea,
) -> Result<PathBuf, FactoryError> {
    let fetch_failed = |reason: String| FactoryError::FetchFailed {
        uri: uri.to_string(),
        reason,
    };

    let response = client.get(uri).send().await.map_err(|e| {
        if e.is_timeout() {
            fetch_failed("request timed out".into())
        } else {
            fetch_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(fetch_failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| fetch_failed(e.to_string()))?;

    let dest = scratch.new_document()?;
    info!("Saving PDF from '{}' to '{}'", uri, dest.display());
    tokio::fs::write(&dest, &bytes)
        .await
        .map_err(|e| FactoryError::CopyFailed {
            from: PathBuf::from(uri),
            to: dest.clone(),
            source: e,
        })?;
    Ok(dest)
}

/// Copy a local PDF into a new scratch document.
pub async fn copy_local(path: &Path, scratch: &ScratchArea) -> Result<PathBuf, FactoryError> {
    let dest = scratch.new_document()?;
    info!("Copying '{}' to '{}'", path.display(), dest.display());
    copy(path, &dest).await?;
    Ok(dest)
}

/// Copy an item's existing output into a new scratch document.
pub async fn reuse_existing(output: &Path, scratch: &ScratchArea) -> Result<PathBuf, FactoryError> {
    let dest = scratch.new_document()?;
    info!(
        "Reusing existing file '{}' as '{}'",
        output.display(),
        dest.display()
    );
    copy(output, &dest).await?;
    Ok(dest)
}

async fn copy(from: &Path, to: &Path) -> Result<(), FactoryError> {
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|e| FactoryError::CopyFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        })
}
