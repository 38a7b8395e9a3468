//! Job entry points: resolve every item, merge, publish, notify.
//!
//! A job run is all-or-nothing. Items are resolved one after another in job
//! order; the first failure aborts the run and nothing is written at the
//! final output path. The merged document is built in the scratch area and
//! moved into place only once it is complete.
//!
//! Whatever the outcome, the scratch area is removed and the job's callback
//! (if any) is told whether the run succeeded.

use crate::config::FactoryConfig;
use crate::error::FactoryError;
use crate::job::{self, Job, JobDescriptor};
use crate::notify::notify_logged;
use crate::output::{ItemReport, JobReport, JobStatus};
use crate::pipeline::resolve::resolve_item;
use crate::pipeline::scratch::ScratchArea;
use crate::pipeline::{input, publish, JobContext};
use crate::toolkit::toolkit_for;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Generate the merged PDF for `job`.
///
/// # Returns
/// A [`JobReport`] with [`JobStatus::UpToDate`] when the final output already
/// exists and the job does not overwrite it, otherwise
/// [`JobStatus::Generated`] with one [`ItemReport`] per item.
///
/// # Errors
/// The first fatal error met while resolving items or merging them. The
/// callback is notified of the failure before the error is returned.
///
/// # Example
/// ```rust,no_run
/// use pdf_factory::{generate, FactoryConfig, Job};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let job = Job::from_json_str(r#"{
///     "output": "bundle.pdf",
///     "items": [
///         {"uri": "https://example.com/cover.html"},
///         {"uri": "forms/application.pdf", "data": {"name": "Ada"}}
///     ]
/// }"#)?;
/// let report = generate(&job, &FactoryConfig::default()).await?;
/// println!("{}", report.output.display());
/// # Ok(())
/// # }
/// ```
pub async fn generate(job: &Job, config: &FactoryConfig) -> Result<JobReport, FactoryError> {
    let start = Instant::now();
    let result = run(job, config, start).await;
    match result {
        Ok(ref report) => {
            if let Some(ref cb) = config.progress_callback {
                match report.status {
                    JobStatus::Generated => cb.on_job_complete(report),
                    JobStatus::UpToDate => cb.on_job_skipped(&report.output),
                }
            }
        }
        Err(ref e) => {
            error!("Job for '{}' failed: {}", job.output, e);
            report_failure(config, e);
        }
    }
    notify_logged(job.callback.as_deref(), result.is_ok(), config).await;
    result
}

/// Load a job descriptor from a local path or `http(s)://` URI and generate it.
///
/// An up-to-date final output is detected before the items are validated,
/// so a finished job is never rejected for its item list. A descriptor that
/// parses but fails validation still has its callback notified of the
/// failure.
pub async fn generate_from_source(
    source: &str,
    config: &FactoryConfig,
) -> Result<JobReport, FactoryError> {
    let start = Instant::now();
    info!("Loading job from {}", source);
    let descriptor = match job::load_descriptor(source, config).await {
        Ok(descriptor) => descriptor,
        Err(e) => {
            error!("Cannot load job from '{}': {}", source, e);
            report_failure(config, &e);
            return Err(e);
        }
    };
    let callback = descriptor.callback.clone();

    let result = match up_to_date_descriptor(&descriptor, config, start).await {
        Ok(Some(report)) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_job_skipped(&report.output);
            }
            Ok(report)
        }
        Ok(None) => match Job::try_from(descriptor) {
            Ok(job) => return generate(&job, config).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };
    if let Err(ref e) = result {
        error!("Job from '{}' failed: {}", source, e);
        report_failure(config, e);
    }
    notify_logged(callback.as_deref(), result.is_ok(), config).await;
    result
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(job: &Job, config: &FactoryConfig) -> Result<JobReport, FactoryError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FactoryError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(job, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn report_failure(config: &FactoryConfig, error: &FactoryError) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_job_failed(&error.to_string());
    }
}

async fn run(job: &Job, config: &FactoryConfig, start: Instant) -> Result<JobReport, FactoryError> {
    let output = publish::resolve_output(&config.output_root, &job.output)?;
    if !job.overwrite && exists(&output).await {
        return Ok(up_to_date(output, start));
    }

    info!(
        "Starting job: {} item(s) into '{}'",
        job.items.len(),
        output.display()
    );
    let client = input::http_client(config.download_timeout_secs)?;
    let scratch = ScratchArea::create(config.scratch_parent.as_deref())?;
    debug!("Scratch area: {}", scratch.path().display());

    let result = merge(job, config, &output, client, &scratch).await;
    if let Err(e) = scratch.close() {
        warn!("{}", e);
    }
    let items = result?;

    let report = JobReport {
        output,
        status: JobStatus::Generated,
        items,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Job complete: {} item(s) merged into '{}' in {}ms",
        report.items.len(),
        report.output.display(),
        report.total_duration_ms
    );
    Ok(report)
}

/// Resolve every item in order, concatenate, and install the result.
async fn merge(
    job: &Job,
    config: &FactoryConfig,
    output: &Path,
    client: reqwest::Client,
    scratch: &ScratchArea,
) -> Result<Vec<ItemReport>, FactoryError> {
    let ctx = JobContext {
        config,
        client,
        scratch,
        toolkit: toolkit_for(config),
    };
    let total = job.items.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_job_start(total);
    }

    let mut documents: Vec<PathBuf> = Vec::with_capacity(total);
    let mut reports = Vec::with_capacity(total);
    for (index, item) in job.items.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_item_start(index, total, &item.uri);
        }
        let item_start = Instant::now();
        let data = job.effective_data(item);

        let doc = match resolve_item(&ctx, item, &data).await {
            Ok(doc) => doc,
            Err(e) => {
                error!("Item {} ('{}') failed: {}", index, item.uri, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_error(index, total, &e.to_string());
                }
                return Err(e);
            }
        };

        let report = ItemReport {
            index,
            uri: item.uri.clone(),
            acquisition: doc.acquisition,
            filled: doc.filled,
            published: doc.published,
            duration_ms: item_start.elapsed().as_millis() as u64,
        };
        debug!("Item {} resolved: {:?}", index, report);
        if let Some(ref cb) = config.progress_callback {
            cb.on_item_complete(index, total, &report);
        }
        documents.push(doc.path);
        reports.push(report);
    }

    let merged = scratch.new_document()?;
    info!(
        "Concatenating {} document(s) into '{}'",
        documents.len(),
        output.display()
    );
    ctx.toolkit
        .concat(&documents, &merged)
        .await
        .map_err(|source| FactoryError::ConcatFailed { source })?;
    publish::install(&merged, output).await?;

    Ok(reports)
}

/// The up-to-date report for a descriptor whose final output already exists,
/// checked before the rest of the descriptor is validated.
async fn up_to_date_descriptor(
    descriptor: &JobDescriptor,
    config: &FactoryConfig,
    start: Instant,
) -> Result<Option<JobReport>, FactoryError> {
    let Some(ref requested) = descriptor.output else {
        return Ok(None);
    };
    if descriptor.overwrite.unwrap_or(true) {
        return Ok(None);
    }
    let output = publish::resolve_output(&config.output_root, requested)?;
    if exists(&output).await {
        Ok(Some(up_to_date(output, start)))
    } else {
        Ok(None)
    }
}

fn up_to_date(output: PathBuf, start: Instant) -> JobReport {
    info!(
        "Final output '{}' already exists; nothing to do",
        output.display()
    );
    JobReport {
        output,
        status: JobStatus::UpToDate,
        items: Vec::new(),
        total_duration_ms: start.elapsed().as_millis() as u64,
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}
