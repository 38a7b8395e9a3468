//! Resource classification: decide which acquisition strategy a source needs.
//!
//! Remote sources are probed with a HEAD request and classified by their
//! declared `Content-Type`. Local sources are classified by their leading
//! bytes, the same way the rest of the pipeline recognises a PDF by its
//! `%PDF` magic.

use crate::error::FactoryError;
use crate::pipeline::input::is_url;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// How many leading bytes of a local file are inspected.
const SNIFF_LEN: u64 = 512;

/// Content kind of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// Another job descriptor (`application/json`).
    StructuredJob,
    /// A PDF document.
    Document,
    /// An HTML page to be rendered.
    Hypertext,
    /// Anything else; carries the detected content type.
    Unsupported(String),
}

impl ResourceKind {
    /// Classify a declared content type by prefix, ignoring case and parameters.
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct.starts_with("application/json") {
            ResourceKind::StructuredJob
        } else if ct.starts_with("application/pdf") {
            ResourceKind::Document
        } else if ct.starts_with("text/html") {
            ResourceKind::Hypertext
        } else {
            ResourceKind::Unsupported(content_type.trim().to_string())
        }
    }

    /// Classify content by its leading bytes.
    pub fn sniff(head: &[u8]) -> Self {
        let body = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
        if body.starts_with(b"%PDF") {
            return ResourceKind::Document;
        }

        let start = body
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(body.len());
        let text = &body[start..];
        let lower: Vec<u8> = text.iter().take(16).map(u8::to_ascii_lowercase).collect();

        if lower.starts_with(b"<!doctype html") || lower.starts_with(b"<html") {
            ResourceKind::Hypertext
        } else if text.starts_with(b"{") || text.starts_with(b"[") {
            ResourceKind::StructuredJob
        } else if head.is_empty() {
            ResourceKind::Unsupported("application/x-empty".into())
        } else if std::str::from_utf8(head).is_ok() {
            ResourceKind::Unsupported("text/plain".into())
        } else {
            ResourceKind::Unsupported("application/octet-stream".into())
        }
    }
}

/// Classify a remote or local source.
pub async fn classify(uri: &str, client: &reqwest::Client) -> Result<ResourceKind, FactoryError> {
    let kind = if is_url(uri) {
        probe_remote(uri, client).await?
    } else {
        detect_local(Path::new(uri)).await?
    };
    debug!("Classified '{}' as {:?}", uri, kind);
    Ok(kind)
}

async fn probe_remote(uri: &str, client: &reqwest::Client) -> Result<ResourceKind, FactoryError> {
    let probe_failed = |reason: String| FactoryError::ProbeFailed {
        uri: uri.to_string(),
        reason,
    };

    let response = client
        .head(uri)
        .send()
        .await
        .map_err(|e| probe_failed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(probe_failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Ok(ResourceKind::from_content_type(content_type))
}

async fn detect_local(path: &Path) -> Result<ResourceKind, FactoryError> {
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(FactoryError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let read_failed = |e: std::io::Error| FactoryError::ProbeFailed {
        uri: path.display().to_string(),
        reason: e.to_string(),
    };
    let file = tokio::fs::File::open(path).await.map_err(read_failed)?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN)
        .read_to_end(&mut head)
        .await
        .map_err(read_failed)?;

    Ok(ResourceKind::sniff(&head))
}
