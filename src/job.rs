//! Job descriptors: the JSON a caller submits, and the validated [`Job`]
//! the coordinator consumes.
//!
//! A descriptor is parsed leniently into [`JobDescriptor`] (every field
//! optional) and then converted into a [`Job`], which reports the first
//! missing required value by its JSON path (`items[1].uri`). The split lets
//! the coordinator still reach the descriptor's callback when validation
//! fails.
//!
//! ```json
//! {
//!   "output": "contracts/alice.pdf",
//!   "overwrite": false,
//!   "callback": "https://example.com/hooks/pdf",
//!   "data": { "name": "Alice" },
//!   "items": [
//!     { "uri": "https://example.com/cover.html", "options": ["--page-size", "A4"] },
//!     { "uri": "forms/contract.pdf", "output": "contracts/alice-form.pdf" }
//!   ]
//! }
//! ```

use crate::config::FactoryConfig;
use crate::error::FactoryError;
use crate::pipeline::input;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Form-field name → value.
pub type FieldData = BTreeMap<String, String>;

/// A job descriptor exactly as submitted; every field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub output: Option<String>,
    pub overwrite: Option<bool>,
    pub callback: Option<String>,
    pub data: Option<FieldData>,
    pub items: Option<Vec<ItemDescriptor>>,
}

/// One item of a [`JobDescriptor`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub uri: Option<String>,
    pub output: Option<String>,
    pub overwrite: Option<bool>,
    pub options: Option<Vec<String>>,
    pub data: Option<FieldData>,
}

/// A validated job.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    /// Final merged document, relative to the output root.
    pub output: String,
    /// Regenerate the final output even if it exists. Default: true.
    pub overwrite: bool,
    /// Webhook informed of the outcome.
    pub callback: Option<String>,
    /// Defaults applied to every item's fill data.
    pub data: FieldData,
    /// Items in merge order.
    pub items: Vec<Item>,
}

/// A validated item.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    /// Remote (`http://`, `https://`) or local source.
    pub uri: String,
    /// Where to publish the resolved document, relative to the output root.
    pub output: Option<String>,
    /// Regenerate `output` even if it exists. Default: true.
    pub overwrite: bool,
    /// Passed verbatim to the HTML renderer after its base flags.
    pub options: Vec<String>,
    /// Item-specific fill data; wins over the job defaults.
    pub data: FieldData,
}

impl JobDescriptor {
    /// Parse a descriptor from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, FactoryError> {
        serde_json::from_str(s).map_err(|e| FactoryError::InvalidJob {
            reason: e.to_string(),
        })
    }

    /// Parse a descriptor from raw bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, FactoryError> {
        serde_json::from_slice(bytes).map_err(|e| FactoryError::InvalidJob {
            reason: e.to_string(),
        })
    }
}

impl TryFrom<JobDescriptor> for Job {
    type Error = FactoryError;

    fn try_from(desc: JobDescriptor) -> Result<Self, Self::Error> {
        let output = desc.output.ok_or_else(|| missing("output"))?;
        let raw_items = desc.items.ok_or_else(|| missing("items"))?;
        if raw_items.is_empty() {
            return Err(FactoryError::InvalidJob {
                reason: "'items' must contain at least one item".into(),
            });
        }

        let items = raw_items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                Ok(Item {
                    uri: item.uri.ok_or_else(|| missing(&format!("items[{i}].uri")))?,
                    output: item.output,
                    overwrite: item.overwrite.unwrap_or(true),
                    options: item.options.unwrap_or_default(),
                    data: item.data.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, FactoryError>>()?;

        Ok(Job {
            output,
            overwrite: desc.overwrite.unwrap_or(true),
            callback: desc.callback,
            data: desc.data.unwrap_or_default(),
            items,
        })
    }
}

impl Job {
    /// Parse and validate a job from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, FactoryError> {
        JobDescriptor::from_json_str(s)?.try_into()
    }

    /// The data an item is filled with: job defaults overlaid by the item's
    /// own values.
    pub fn effective_data(&self, item: &Item) -> FieldData {
        let mut data = self.data.clone();
        data.extend(item.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        data
    }
}

fn missing(field: &str) -> FactoryError {
    FactoryError::MissingField {
        field: field.to_string(),
    }
}

/// Read a descriptor from a local path or an `http(s)://` URI.
pub async fn load_descriptor(
    source: &str,
    config: &FactoryConfig,
) -> Result<JobDescriptor, FactoryError> {
    let bytes = input::read_source(source, config.download_timeout_secs).await?;
    debug!("Read {} bytes of job descriptor from {}", bytes.len(), source);
    JobDescriptor::from_json_slice(&bytes)
}

/// Read and validate a job from a local path or an `http(s)://` URI.
pub async fn load_job(source: &str, config: &FactoryConfig) -> Result<Job, FactoryError> {
    load_descriptor(source, config).await?.try_into()
}
