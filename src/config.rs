//! Configuration types for PDF job generation.
//!
//! Every knob the pipeline reads (binary locations, the output root, the
//! renderer budget and the failure policies) lives in [`FactoryConfig`] and
//! is passed explicitly to each stage. Two jobs with two configs can run side by
//! side in the same process (tests do exactly that with separate output roots).
//!
//! Build one through [`FactoryConfig::builder()`] or start from
//! [`FactoryConfig::default()`].

use crate::error::FactoryError;
use crate::progress::ProgressCallback;
use crate::toolkit::PdfToolkit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Base flags passed to the HTML renderer before any item options.
pub const DEFAULT_RENDERER_ARGS: [&str; 3] = [
    "--disable-smart-shrinking",
    "--print-media-type",
    "--use-xserver",
];

/// Configuration for a job run.
///
/// # Example
/// ```rust
/// use pdf_factory::{FactoryConfig, FillFailurePolicy};
///
/// let config = FactoryConfig::builder()
///     .output_root("./outputs")
///     .renderer_path("/usr/local/bin/wkhtmltopdf")
///     .fill_failure(FillFailurePolicy::UseUnfilled)
///     .build()
///     .unwrap();
/// assert_eq!(config.render_budget().as_secs(), 120);
/// ```
#[derive(Clone)]
pub struct FactoryConfig {
    /// Directory every final and per-item output must resolve within. Default: `./outputs/`.
    pub output_root: PathBuf,

    /// Parent directory for per-job scratch areas. Default: the system temp dir.
    pub scratch_parent: Option<PathBuf>,

    /// HTML renderer binary. Default: `wkhtmltopdf`.
    pub renderer_path: PathBuf,

    /// Flags placed before item options on every renderer invocation.
    /// Default: [`DEFAULT_RENDERER_ARGS`].
    pub renderer_args: Vec<String>,

    /// Renderer polling granularity in milliseconds. Default: 50.
    pub render_poll_interval_ms: u64,

    /// Number of polling intervals before the renderer is killed. Default: 2400.
    ///
    /// The overall budget is `render_poll_interval_ms × render_max_polls`
    /// (two minutes with the defaults).
    pub render_max_polls: u32,

    /// Treat a non-zero renderer exit as fatal. Default: true.
    ///
    /// Some renderer builds exit with 1 after printing harmless network
    /// warnings while still producing a complete document; set this to
    /// false to keep such output.
    pub abort_on_render_failure: bool,

    /// What to do when form filling fails. Default: [`FillFailurePolicy::Abort`].
    pub fill_failure: FillFailurePolicy,

    /// Flatten form fields after filling. Default: true.
    pub flatten_forms: bool,

    /// Toolkit binary used by the default [`crate::toolkit::Pdftk`]. Default: `pdftk`.
    pub pdftk_path: PathBuf,

    /// Pre-constructed toolkit. Takes precedence over `pdftk_path`.
    pub toolkit: Option<Arc<dyn PdfToolkit>>,

    /// Timeout for HEAD probes, document downloads and descriptor downloads
    /// in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Timeout for the completion webhook in seconds. Default: 5.
    pub callback_timeout_secs: u64,

    /// Receives per-item events while the job runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("./outputs/"),
            scratch_parent: None,
            renderer_path: PathBuf::from("wkhtmltopdf"),
            renderer_args: DEFAULT_RENDERER_ARGS.iter().map(|s| s.to_string()).collect(),
            render_poll_interval_ms: 50,
            render_max_polls: 2400,
            abort_on_render_failure: true,
            fill_failure: FillFailurePolicy::default(),
            flatten_forms: true,
            pdftk_path: PathBuf::from("pdftk"),
            toolkit: None,
            download_timeout_secs: 120,
            callback_timeout_secs: 5,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FactoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryConfig")
            .field("output_root", &self.output_root)
            .field("scratch_parent", &self.scratch_parent)
            .field("renderer_path", &self.renderer_path)
            .field("renderer_args", &self.renderer_args)
            .field("render_poll_interval_ms", &self.render_poll_interval_ms)
            .field("render_max_polls", &self.render_max_polls)
            .field("abort_on_render_failure", &self.abort_on_render_failure)
            .field("fill_failure", &self.fill_failure)
            .field("flatten_forms", &self.flatten_forms)
            .field("pdftk_path", &self.pdftk_path)
            .field("toolkit", &self.toolkit.as_ref().map(|_| "<dyn PdfToolkit>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("callback_timeout_secs", &self.callback_timeout_secs)
            .finish()
    }
}

impl FactoryConfig {
    /// Create a new builder for `FactoryConfig`.
    pub fn builder() -> FactoryConfigBuilder {
        FactoryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Total time the renderer may run before it is killed.
    pub fn render_budget(&self) -> Duration {
        Duration::from_millis(
            self.render_poll_interval_ms
                .saturating_mul(u64::from(self.render_max_polls)),
        )
    }
}

/// Builder for [`FactoryConfig`].
#[derive(Debug)]
pub struct FactoryConfigBuilder {
    config: FactoryConfig,
}

impl FactoryConfigBuilder {
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.output_root = root.into();
        self
    }

    pub fn scratch_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_parent = Some(dir.into());
        self
    }

    pub fn renderer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.renderer_path = path.into();
        self
    }

    pub fn renderer_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.renderer_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn render_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.render_poll_interval_ms = ms.max(1);
        self
    }

    pub fn render_max_polls(mut self, polls: u32) -> Self {
        self.config.render_max_polls = polls.max(1);
        self
    }

    pub fn abort_on_render_failure(mut self, v: bool) -> Self {
        self.config.abort_on_render_failure = v;
        self
    }

    pub fn fill_failure(mut self, policy: FillFailurePolicy) -> Self {
        self.config.fill_failure = policy;
        self
    }

    pub fn flatten_forms(mut self, v: bool) -> Self {
        self.config.flatten_forms = v;
        self
    }

    pub fn pdftk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdftk_path = path.into();
        self
    }

    pub fn toolkit(mut self, toolkit: Arc<dyn PdfToolkit>) -> Self {
        self.config.toolkit = Some(toolkit);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn callback_timeout_secs(mut self, secs: u64) -> Self {
        self.config.callback_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FactoryConfig, FactoryError> {
        let c = &self.config;
        if c.output_root.as_os_str().is_empty() {
            return Err(FactoryError::InvalidConfig(
                "output root must not be empty".into(),
            ));
        }
        if c.renderer_path.as_os_str().is_empty() {
            return Err(FactoryError::InvalidConfig(
                "renderer path must not be empty".into(),
            ));
        }
        if c.download_timeout_secs == 0 || c.callback_timeout_secs == 0 {
            return Err(FactoryError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Behaviour when the form filler fails on an item.
///
/// | Policy | Effect |
/// |--------|--------|
/// | `Abort` | the item fails, and with it the whole job (default) |
/// | `UseUnfilled` | a warning is logged and the unfilled document is merged |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillFailurePolicy {
    /// Propagate the fill error; the partial filled file is discarded.
    #[default]
    Abort,
    /// Log the error and continue with the unfilled document.
    UseUnfilled,
}
