//! Input reading: turn a path or URL naming a job descriptor into bytes,
//! and build the HTTP client every network stage shares.
//!
//! The client is built once per job run with the configured download
//! timeout so HEAD probes, document downloads and descriptor downloads all
//! fail the same way when a server stalls.

use crate::error::FactoryError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Build the HTTP client used for probes and downloads.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, FactoryError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FactoryError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Read the whole content of a local file or an `http(s)://` URL.
pub async fn read_source(source: &str, timeout_secs: u64) -> Result<Vec<u8>, FactoryError> {
    if is_url(source) {
        download(source, timeout_secs).await
    } else {
        read_local(source).await
    }
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, FactoryError> {
    let path = PathBuf::from(path_str);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| FactoryError::JobLoadFailed {
            source_uri: path_str.to_string(),
            reason: e.to_string(),
        })?;
    debug!("Read local job descriptor: {}", path.display());
    Ok(bytes)
}

async fn download(url: &str, timeout_secs: u64) -> Result<Vec<u8>, FactoryError> {
    info!("Downloading job descriptor from: {}", url);
    let load_failed = |reason: String| FactoryError::JobLoadFailed {
        source_uri: url.to_string(),
        reason,
    };

    let client = http_client(timeout_secs)?;
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            load_failed(format!("timed out after {timeout_secs}s"))
        } else {
            load_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(load_failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| load_failed(e.to_string()))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/job.json"));
        assert!(is_url("http://example.com/job.json"));
        assert!(!is_url("/tmp/job.json"));
        assert!(!is_url("job.json"));
        assert!(!is_url("ftp://example.com/job.json"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn missing_local_descriptor_is_a_load_error() {
        let err = read_source("/definitely/not/a/job.json", 5).await.unwrap_err();
        assert!(matches!(err, FactoryError::JobLoadFailed { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn reads_local_descriptor_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, br#"{"output":"a.pdf"}"#).unwrap();

        let bytes = read_source(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(bytes, br#"{"output":"a.pdf"}"#);
    }
}
