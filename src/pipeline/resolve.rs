//! Item resolution: turn one job item into a scratch PDF.
//!
//! ```text
//! CheckExisting ──▶ Classify ──▶ Acquire ──▶ Fill? ──▶ Publish? ──▶ Done
//!       │                                                ▲
//!       └──────────── reuse existing output ─────────────┘
//! ```
//!
//! Any error ends the item; nothing is retried. The item's output path is
//! checked against the output root before anything is deleted or written.

use crate::config::FillFailurePolicy;
use crate::error::FactoryError;
use crate::job::{FieldData, Item};
use crate::output::Acquisition;
use crate::pipeline::classify::{classify, ResourceKind};
use crate::pipeline::input::is_url;
use crate::pipeline::{acquire, publish, render, JobContext, ResolvedDocument};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolve `item`, filling it with `data` (its effective data) when possible.
pub async fn resolve_item(
    ctx: &JobContext<'_>,
    item: &Item,
    data: &FieldData,
) -> Result<ResolvedDocument, FactoryError> {
    debug!("Processing item: {:?}", item);

    let target = item
        .output
        .as_deref()
        .map(|o| publish::resolve_output(&ctx.config.output_root, o))
        .transpose()?;

    // ── CheckExisting ────────────────────────────────────────────────────
    if let Some(ref target) = target {
        if tokio::fs::symlink_metadata(target).await.is_ok() {
            if !item.overwrite {
                let path = acquire::reuse_existing(target, ctx.scratch).await?;
                return Ok(ResolvedDocument {
                    path,
                    acquisition: Acquisition::Reused,
                    filled: false,
                    published: None,
                });
            }
            info!("Removing previous output '{}'", target.display());
            tokio::fs::remove_file(target)
                .await
                .map_err(|source| FactoryError::CleanupFailed {
                    path: target.clone(),
                    source,
                })?;
        }
    }

    // ── Classify → Acquire ───────────────────────────────────────────────
    let (path, acquisition) = acquire_item(ctx, item).await?;

    // ── Fill? ────────────────────────────────────────────────────────────
    let (path, filled) = if !data.is_empty() && acquisition.is_fillable() {
        fill(ctx, path, data).await?
    } else {
        (path, false)
    };

    // ── Publish? ─────────────────────────────────────────────────────────
    if let Some(ref target) = target {
        publish::copy_to(&path, target).await?;
    }

    Ok(ResolvedDocument {
        path,
        acquisition,
        filled,
        published: target,
    })
}

async fn acquire_item(
    ctx: &JobContext<'_>,
    item: &Item,
) -> Result<(PathBuf, Acquisition), FactoryError> {
    let uri = item.uri.as_str();
    match classify(uri, &ctx.client).await? {
        ResourceKind::Document if is_url(uri) => Ok((
            acquire::fetch_remote(uri, &ctx.client, ctx.scratch).await?,
            Acquisition::Fetched,
        )),
        ResourceKind::Document => Ok((
            acquire::copy_local(Path::new(uri), ctx.scratch).await?,
            Acquisition::Copied,
        )),
        ResourceKind::Hypertext => Ok((
            render::render_html(uri, &item.options, ctx.scratch, ctx.config).await?,
            Acquisition::Rendered,
        )),
        ResourceKind::StructuredJob => Err(FactoryError::NestedJob {
            uri: uri.to_string(),
        }),
        ResourceKind::Unsupported(content_type) => Err(FactoryError::UnsupportedType {
            uri: uri.to_string(),
            content_type,
        }),
    }
}

async fn fill(
    ctx: &JobContext<'_>,
    source: PathBuf,
    data: &FieldData,
) -> Result<(PathBuf, bool), FactoryError> {
    let dest = ctx.scratch.new_document()?;
    info!(
        "Filling '{}' with {} field(s)",
        source.display(),
        data.len()
    );

    match ctx.toolkit.fill_form(&source, data, &dest).await {
        Ok(()) => Ok((dest, true)),
        Err(e) => {
            let _ = tokio::fs::remove_file(&dest).await;
            match ctx.config.fill_failure {
                FillFailurePolicy::Abort => Err(FactoryError::FillFailed {
                    path: source,
                    source: e,
                }),
                FillFailurePolicy::UseUnfilled => {
                    warn!(
                        "Form filling failed for '{}', using the unfilled document: {}",
                        source.display(),
                        e
                    );
                    Ok((source, false))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FactoryConfig;
    use crate::error::ToolError;
    use crate::pipeline::scratch::ScratchArea;
    use crate::toolkit::PdfToolkit;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Appends the field data to the source; fails when `fail` is set.
    #[derive(Default)]
    struct StubToolkit {
        fail: bool,
        fills: AtomicUsize,
    }

    #[async_trait]
    impl PdfToolkit for StubToolkit {
        async fn fill_form(
            &self,
            source: &Path,
            data: &FieldData,
            dest: &Path,
        ) -> Result<(), ToolError> {
            self.fills.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                std::fs::write(dest, b"half-written")?;
                return Err(ToolError::Other("no such field".into()));
            }
            let mut bytes = std::fs::read(source)?;
            for (k, v) in data {
                bytes.extend_from_slice(format!(" {k}={v}").as_bytes());
            }
            std::fs::write(dest, bytes)?;
            Ok(())
        }

        async fn concat(&self, _sources: &[PathBuf], _dest: &Path) -> Result<(), ToolError> {
            unreachable!("items are never concatenated")
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        config: FactoryConfig,
        toolkit: Arc<StubToolkit>,
    }

    impl Fixture {
        fn new(toolkit: StubToolkit) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = FactoryConfig::builder()
                .output_root(dir.path().join("outputs"))
                .build()
                .unwrap();
            Self {
                dir,
                config,
                toolkit: Arc::new(toolkit),
            }
        }

        fn source(&self, name: &str, body: &[u8]) -> String {
            let path = self.dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            path.to_string_lossy().to_string()
        }

        async fn resolve(&self, item: &Item, data: &FieldData) -> Result<ResolvedDocument, FactoryError> {
            let scratch = ScratchArea::create(Some(self.dir.path())).unwrap();
            let ctx = JobContext {
                config: &self.config,
                client: reqwest::Client::new(),
                scratch: &scratch,
                toolkit: self.toolkit.clone(),
            };
            let mut doc = resolve_item(&ctx, item, data).await?;
            // Keep the bytes around after the scratch area is gone.
            let kept = self.dir.path().join(format!("kept-{}.pdf", rand_suffix()));
            std::fs::copy(&doc.path, &kept).unwrap();
            doc.path = kept;
            Ok(doc)
        }
    }

    fn rand_suffix() -> usize {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        NEXT.fetch_add(1, Ordering::SeqCst)
    }

    fn item(uri: String) -> Item {
        Item {
            uri,
            output: None,
            overwrite: true,
            options: vec![],
            data: FieldData::new(),
        }
    }

    fn data(pairs: &[(&str, &str)]) -> FieldData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn local_pdf_is_copied_and_filled() {
        let fx = Fixture::new(StubToolkit::default());
        let it = item(fx.source("form.pdf", b"%PDF form"));

        let doc = fx.resolve(&it, &data(&[("name", "Bob")])).await.unwrap();

        assert_eq!(doc.acquisition, Acquisition::Copied);
        assert!(doc.filled);
        assert_eq!(std::fs::read(&doc.path).unwrap(), b"%PDF form name=Bob");
    }

    #[tokio::test]
    async fn empty_data_skips_filling() {
        let fx = Fixture::new(StubToolkit::default());
        let it = item(fx.source("form.pdf", b"%PDF form"));

        let doc = fx.resolve(&it, &FieldData::new()).await.unwrap();

        assert!(!doc.filled);
        assert_eq!(fx.toolkit.fills.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fill_failure_aborts_by_default() {
        let fx = Fixture::new(StubToolkit {
            fail: true,
            ..Default::default()
        });
        let it = item(fx.source("form.pdf", b"%PDF form"));

        let err = fx.resolve(&it, &data(&[("name", "Bob")])).await.unwrap_err();
        assert!(matches!(err, FactoryError::FillFailed { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn fill_failure_can_fall_back_to_unfilled() {
        let mut fx = Fixture::new(StubToolkit {
            fail: true,
            ..Default::default()
        });
        fx.config.fill_failure = FillFailurePolicy::UseUnfilled;
        let it = item(fx.source("form.pdf", b"%PDF form"));

        let doc = fx.resolve(&it, &data(&[("name", "Bob")])).await.unwrap();

        assert!(!doc.filled);
        assert_eq!(std::fs::read(&doc.path).unwrap(), b"%PDF form");
    }

    #[tokio::test]
    async fn output_is_published_after_filling() {
        let fx = Fixture::new(StubToolkit::default());
        let mut it = item(fx.source("form.pdf", b"%PDF form"));
        it.output = Some("filled/bob.pdf".into());

        let doc = fx.resolve(&it, &data(&[("name", "Bob")])).await.unwrap();

        let published = fx.dir.path().join("outputs/filled/bob.pdf");
        assert_eq!(std::fs::read(&published).unwrap(), b"%PDF form name=Bob");
        assert!(doc.published.unwrap().ends_with("outputs/filled/bob.pdf"));
    }

    #[tokio::test]
    async fn existing_output_is_reused_without_touching_the_source() {
        let fx = Fixture::new(StubToolkit::default());
        let existing = fx.dir.path().join("outputs/keep.pdf");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, b"%PDF stored").unwrap();

        // The source does not even exist: reuse must not classify it.
        let mut it = item(fx.dir.path().join("missing.pdf").to_string_lossy().to_string());
        it.output = Some("keep.pdf".into());
        it.overwrite = false;

        let doc = fx.resolve(&it, &data(&[("name", "Bob")])).await.unwrap();

        assert_eq!(doc.acquisition, Acquisition::Reused);
        assert!(!doc.filled);
        assert_eq!(std::fs::read(&doc.path).unwrap(), b"%PDF stored");
        assert_eq!(fx.toolkit.fills.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn existing_output_is_regenerated_when_overwriting() {
        let fx = Fixture::new(StubToolkit::default());
        let existing = fx.dir.path().join("outputs/regen.pdf");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, b"%PDF stale").unwrap();

        let mut it = item(fx.source("fresh.pdf", b"%PDF fresh"));
        it.output = Some("regen.pdf".into());

        let doc = fx.resolve(&it, &FieldData::new()).await.unwrap();

        assert_eq!(doc.acquisition, Acquisition::Copied);
        assert_eq!(std::fs::read(&existing).unwrap(), b"%PDF fresh");
    }

    #[tokio::test]
    async fn undeletable_previous_output_fails_the_item() {
        let fx = Fixture::new(StubToolkit::default());
        let blocked = fx.dir.path().join("outputs/out/part.pdf");
        std::fs::create_dir_all(blocked.join("inner")).unwrap();

        let mut it = item(fx.source("form.pdf", b"%PDF form"));
        it.output = Some("out/part.pdf".into());

        let err = fx.resolve(&it, &FieldData::new()).await.unwrap_err();

        match err {
            FactoryError::CleanupFailed { ref path, .. } => {
                assert!(path.ends_with("out/part.pdf"), "got {}", path.display())
            }
            other => panic!("expected CleanupFailed, got {other:?}"),
        }
        assert!(blocked.join("inner").is_dir());
    }

    #[tokio::test]
    async fn escaping_output_is_rejected_before_any_write() {
        let fx = Fixture::new(StubToolkit::default());
        let mut it = item(fx.source("form.pdf", b"%PDF form"));
        it.output = Some("../../escaped.pdf".into());

        let err = fx.resolve(&it, &FieldData::new()).await.unwrap_err();

        assert!(matches!(err, FactoryError::PathEscape { .. }), "got {err:?}");
        assert!(!fx.dir.path().join("outputs").exists());
    }

    #[tokio::test]
    async fn unsupported_and_nested_sources_fail() {
        let fx = Fixture::new(StubToolkit::default());

        let err = fx
            .resolve(&item(fx.source("notes.txt", b"plain notes")), &FieldData::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FactoryError::UnsupportedType { .. }), "got {err:?}");

        let err = fx
            .resolve(&item(fx.source("job.json", br#"{"items":[]}"#)), &FieldData::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FactoryError::NestedJob { .. }), "got {err:?}");
    }
}
