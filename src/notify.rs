//! Completion webhook.
//!
//! When a job names a `callback` URI, the outcome is POSTed to it as
//! `{"success": true}` or `{"success": false}`. Delivery is best-effort: the
//! coordinator logs a [`FactoryError::NotifyFailed`] and moves on.

use crate::config::FactoryConfig;
use crate::error::FactoryError;
use crate::pipeline::input::http_client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Body of the completion webhook.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Notification {
    pub success: bool,
}

/// POST the job outcome to `callback`.
pub async fn notify(
    callback: &str,
    success: bool,
    config: &FactoryConfig,
) -> Result<(), FactoryError> {
    let notify_failed = |reason: String| FactoryError::NotifyFailed {
        url: callback.to_string(),
        reason,
    };

    let body = serde_json::to_vec(&Notification { success })
        .map_err(|e| FactoryError::Internal(format!("notification body: {e}")))?;
    let client = http_client(config.callback_timeout_secs)?;

    debug!("Posting success={} to '{}'", success, callback);
    let response = client
        .post(callback)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                notify_failed(format!(
                    "no answer within {}s",
                    config.callback_timeout_secs
                ))
            } else {
                notify_failed(e.to_string())
            }
        })?;

    if !response.status().is_success() {
        return Err(notify_failed(format!("HTTP {}", response.status())));
    }
    info!("Notified '{}' (success={})", callback, success);
    Ok(())
}

/// Notify `callback` if there is one; failures are only logged.
pub(crate) async fn notify_logged(callback: Option<&str>, success: bool, config: &FactoryConfig) {
    let Some(callback) = callback else {
        return;
    };
    if let Err(e) = notify(callback, success, config).await {
        warn!("{}", e);
    }
}
