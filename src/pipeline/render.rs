//! HTML rendering: run the external renderer (wkhtmltopdf) on a page.
//!
//! The renderer is invoked as
//! `renderer <base args…> <item options…> <source> <destination>`,
//! with item options passed through verbatim and in order.
//!
//! ## Bounded wait
//!
//! The renderer gets `render_poll_interval_ms × render_max_polls` to finish.
//! The wait races the child's exit against a timer, so a fast render
//! returns as soon as the process exits and a hung one is killed exactly
//! when the budget runs out.

use crate::config::FactoryConfig;
use crate::error::FactoryError;
use crate::pipeline::scratch::ScratchArea;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Longest stderr excerpt kept in a [`FactoryError::RenderFailed`] message.
const STDERR_EXCERPT: usize = 500;

/// Render `uri` into a new scratch document and return its path.
pub async fn render_html(
    uri: &str,
    options: &[String],
    scratch: &ScratchArea,
    config: &FactoryConfig,
) -> Result<PathBuf, FactoryError> {
    let dest = scratch.new_document()?;
    let render_failed = |reason: String| FactoryError::RenderFailed {
        uri: uri.to_string(),
        reason,
    };

    info!("Calling renderer on '{}'", uri);
    let mut cmd = Command::new(&config.renderer_path);
    cmd.args(&config.renderer_args)
        .args(options)
        .arg(uri)
        .arg(&dest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!("Renderer command: {:?}", cmd.as_std());

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| {
        render_failed(format!(
            "cannot run '{}': {e}",
            config.renderer_path.display()
        ))
    })?;
    let stderr_task = child.stderr.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf).await;
            buf
        })
    });

    let budget = config.render_budget();
    let waited = tokio::time::timeout(budget, child.wait()).await;
    let status: ExitStatus = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => return Err(render_failed(format!("waiting for renderer: {e}"))),
        Err(_) => {
            error!("Renderer took more than {:?} on '{}'. Aborting.", budget, uri);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill renderer: {}", e);
            }
            return Err(FactoryError::RenderTimeout {
                uri: uri.to_string(),
                elapsed_ms: start.elapsed().as_millis() as u64,
            });
        }
    };

    if !status.success() {
        let stderr = collect_stderr(stderr_task).await;
        if config.abort_on_render_failure {
            error!("Renderer exited with {} on '{}'. Aborting.", status, uri);
            return Err(render_failed(format!("{status}: {stderr}")));
        }
        warn!(
            "Renderer exited with {} on '{}'; keeping its output. {}",
            status, uri, stderr
        );
    }

    info!(
        "Renderer ended in {}ms for '{}'",
        start.elapsed().as_millis(),
        uri
    );
    Ok(dest)
}

/// Last part of the renderer's stderr, for error messages.
async fn collect_stderr(task: Option<JoinHandle<Vec<u8>>>) -> String {
    let Some(task) = task else {
        return String::new();
    };
    // Grandchildren may keep the pipe open after the renderer exits.
    let bytes = match tokio::time::timeout(Duration::from_secs(1), task).await {
        Ok(Ok(bytes)) => bytes,
        _ => return String::new(),
    };
    let text = String::from_utf8_lossy(&bytes);
    let text = text.trim();
    let cut = text
        .char_indices()
        .rev()
        .nth(STDERR_EXCERPT.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[cut..].to_string()
}
