//! CLI binary for pdf-factory.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `FactoryConfig`, runs one job and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_factory::{
    generate_from_source, Acquisition, FactoryConfig, FillFailurePolicy, ItemReport, JobProgressCallback,
    JobReport, JobStatus, ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per item.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the item being resolved.
    item_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_job_start` tells us how many items there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading job…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            item_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Resolving");
    }

    fn item_elapsed(&self) -> f64 {
        self.item_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_job_start(&self, total_items: usize) {
        self.activate_bar(total_items);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Resolving {total_items} item(s)…"))
        ));
    }

    fn on_item_start(&self, index: usize, _total: usize, uri: &str) {
        if let Ok(mut started) = self.item_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("#{} {uri}", index + 1));
    }

    fn on_item_complete(&self, index: usize, total: usize, report: &ItemReport) {
        let how = match report.acquisition {
            Acquisition::Fetched => "fetched",
            Acquisition::Copied => "copied",
            Acquisition::Rendered => "rendered",
            Acquisition::Reused => "reused",
        };
        let how = if report.filled {
            format!("{how}+filled")
        } else {
            how.to_string()
        };

        self.bar.println(format!(
            "  {} Item {:>3}/{:<3}  {:<16} {}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&how),
            report.uri,
            dim(&format!("{:.1}s", self.item_elapsed())),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        // Keep the line on one terminal row.
        let first_line = error.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 80 {
            let cut: String = first_line.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Item {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{:.1}s", self.item_elapsed())),
        ));
        self.bar.inc(1);
    }

    fn on_job_failed(&self, _error: &str) {
        // The error itself is printed by `main`.
        self.bar.abandon();
        eprintln!("{} job failed, no output written", red("✘"));
    }

    fn on_job_complete(&self, report: &JobReport) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} item(s) merged",
            green("✔"),
            bold(&report.items.len().to_string())
        );
    }

    fn on_job_skipped(&self, output: &Path) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} already exists, nothing to do",
            cyan("●"),
            bold(&output.display().to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run a local job descriptor
  pdf-factory jobs/welcome-pack.json

  # Run a job served over HTTP, writing under a custom root
  pdf-factory --output-root /srv/pdf/outputs https://jobs.example.com/42.json

  # Machine-readable report
  pdf-factory --json --no-progress job.json > report.json

JOB DESCRIPTOR:
  {
    "output": "bundle.pdf",          final merged document (required)
    "overwrite": true,               regenerate if it exists (default true)
    "callback": "https://…/done",    POSTed {"success": bool} at the end
    "data": {"name": "Default"},     form values for every item
    "items": [                       merged in this order (required)
      {"uri": "cover.html", "options": ["--zoom", "1.2"]},
      {"uri": "https://example.com/form.pdf",
       "output": "forms/filled.pdf", "data": {"name": "Override"}}
    ]
  }

ENVIRONMENT VARIABLES:
  Every flag can also be set with PDF_FACTORY_<FLAG>, e.g.
  PDF_FACTORY_OUTPUT_ROOT=/srv/pdf/outputs. RUST_LOG overrides the log level.

REQUIREMENTS:
  wkhtmltopdf   renders HTML items      (--renderer)
  pdftk         fills forms and merges  (--pdftk)
"#;

/// Assemble PDFs from JSON job descriptors.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-factory",
    version,
    about = "Assemble one PDF from a JSON job of PDFs and HTML pages",
    long_about = "Run a job descriptor (local path or HTTP/HTTPS URL): fetch, copy or render \
every item, fill form fields from the job's data, and concatenate everything, in order, into \
one PDF under the output root.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Job descriptor: local JSON file path or HTTP/HTTPS URL.
    job: String,

    /// Directory every output path is resolved under.
    #[arg(long, env = "PDF_FACTORY_OUTPUT_ROOT", default_value = "./outputs/")]
    output_root: PathBuf,

    /// Directory in which the per-job scratch directory is created.
    #[arg(long, env = "PDF_FACTORY_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// HTML renderer binary.
    #[arg(long, env = "PDF_FACTORY_RENDERER", default_value = "wkhtmltopdf")]
    renderer: PathBuf,

    /// pdftk binary used for form filling and merging.
    #[arg(long, env = "PDF_FACTORY_PDFTK", default_value = "pdftk")]
    pdftk: PathBuf,

    /// Renderer wait granularity in milliseconds.
    #[arg(long, env = "PDF_FACTORY_RENDER_POLL_MS", default_value_t = 50)]
    render_poll_ms: u64,

    /// Renderer budget in polls (budget = poll-ms × max-polls).
    #[arg(long, env = "PDF_FACTORY_RENDER_MAX_POLLS", default_value_t = 2400)]
    render_max_polls: u32,

    /// Keep the renderer's output even when it exits with an error.
    #[arg(long, env = "PDF_FACTORY_TOLERATE_RENDER_ERRORS")]
    tolerate_render_errors: bool,

    /// Merge the unfilled document when form filling fails.
    #[arg(long, env = "PDF_FACTORY_FILL_FALLBACK")]
    fill_fallback: bool,

    /// Leave filled form fields editable.
    #[arg(long, env = "PDF_FACTORY_NO_FLATTEN")]
    no_flatten: bool,

    /// HTTP timeout in seconds for probes, downloads and the job descriptor.
    #[arg(long, env = "PDF_FACTORY_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Completion webhook timeout in seconds.
    #[arg(long, env = "PDF_FACTORY_CALLBACK_TIMEOUT", default_value_t = 5)]
    callback_timeout: u64,

    /// Print the job report as JSON on stdout.
    #[arg(long, env = "PDF_FACTORY_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_FACTORY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_FACTORY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_FACTORY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn JobProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run job ──────────────────────────────────────────────────────────
    let report = generate_from_source(&cli.job, &config)
        .await
        .with_context(|| format!("Job '{}' failed", cli.job))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        match report.status {
            JobStatus::Generated => eprintln!(
                "Merged {} item(s) into {} in {}ms",
                report.items.len(),
                report.output.display(),
                report.total_duration_ms
            ),
            JobStatus::UpToDate => {
                eprintln!("{} already exists, nothing to do", report.output.display())
            }
        }
    } else if !cli.quiet && report.status == JobStatus::Generated {
        eprintln!(
            "   →  {}  {}",
            bold(&report.output.display().to_string()),
            dim(&format!("{}ms total", report.total_duration_ms)),
        );
    }

    Ok(())
}

/// Map CLI args to `FactoryConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<FactoryConfig> {
    let fill_failure = if cli.fill_fallback {
        FillFailurePolicy::UseUnfilled
    } else {
        FillFailurePolicy::Abort
    };

    let mut builder = FactoryConfig::builder()
        .output_root(&cli.output_root)
        .renderer_path(&cli.renderer)
        .pdftk_path(&cli.pdftk)
        .render_poll_interval_ms(cli.render_poll_ms)
        .render_max_polls(cli.render_max_polls)
        .abort_on_render_failure(!cli.tolerate_render_errors)
        .fill_failure(fill_failure)
        .flatten_forms(!cli.no_flatten)
        .download_timeout_secs(cli.download_timeout)
        .callback_timeout_secs(cli.callback_timeout);

    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_parent(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
