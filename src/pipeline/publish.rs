//! Output paths: containment under the output root, and copying resolved
//! documents to their published locations.
//!
//! Containment is textual. The root and the requested path are made
//! absolute and normalised component by component (`.` dropped, `..`
//! popping its parent), and the result must lie strictly below the root.
//! No filesystem access happens before the check, so a rejected path never
//! causes a write.

use crate::error::FactoryError;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolve `requested` against `root`, rejecting anything that leaves it.
///
/// Absolute `requested` paths are accepted only if they already point
/// inside the root.
pub fn resolve_output(root: &Path, requested: &str) -> Result<PathBuf, FactoryError> {
    let root = normalize(&absolute(root)?);
    let candidate = normalize(&root.join(requested));

    if candidate == root {
        return Err(FactoryError::InvalidJob {
            reason: format!("output path '{requested}' does not name a file"),
        });
    }
    if !candidate.starts_with(&root) {
        return Err(FactoryError::PathEscape {
            path: requested.to_string(),
            root,
        });
    }
    Ok(candidate)
}

fn absolute(path: &Path) -> Result<PathBuf, FactoryError> {
    std::path::absolute(path).map_err(|e| {
        FactoryError::Internal(format!("Cannot make '{}' absolute: {e}", path.display()))
    })
}

/// Lexically normalise a path. `..` above the filesystem root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Copy `src` to `dest`, creating missing parent directories.
pub async fn copy_to(src: &Path, dest: &Path) -> Result<(), FactoryError> {
    create_parent(dest).await?;
    tokio::fs::copy(src, dest)
        .await
        .map_err(|e| FactoryError::CopyFailed {
            from: src.to_path_buf(),
            to: dest.to_path_buf(),
            source: e,
        })?;
    debug!("Published {} → {}", src.display(), dest.display());
    Ok(())
}

/// Move a finished document into place without ever exposing a partial file
/// at `dest`.
///
/// The scratch area may live on another filesystem, so the document is
/// first copied beside `dest` and then renamed over it.
pub async fn install(src: &Path, dest: &Path) -> Result<(), FactoryError> {
    create_parent(dest).await?;

    let tmp_path = dest.with_extension("pdf.tmp");
    let write_failed = |e: std::io::Error| FactoryError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source: e,
    };

    if let Err(e) = tokio::fs::copy(src, &tmp_path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, dest).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}

async fn create_parent(dest: &Path) -> Result<(), FactoryError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FactoryError::OutputWriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_under_root() {
        let root = Path::new("/srv/outputs");
        assert_eq!(
            resolve_output(root, "a.pdf").unwrap(),
            PathBuf::from("/srv/outputs/a.pdf")
        );
        assert_eq!(
            resolve_output(root, "./contracts/2024/../2025/a.pdf").unwrap(),
            PathBuf::from("/srv/outputs/contracts/2025/a.pdf")
        );
    }

    #[test]
    fn traversal_outside_root_is_rejected() {
        let root = Path::new("/srv/outputs");
        for bad in ["../a.pdf", "output/../../etc/passwd", "a/../../../../etc/passwd"] {
            let err = resolve_output(root, bad).unwrap_err();
            assert!(matches!(err, FactoryError::PathEscape { .. }), "{bad}: {err:?}");
        }
    }

    #[test]
    fn sibling_with_common_prefix_is_rejected() {
        let root = Path::new("/srv/outputs");
        let err = resolve_output(root, "../outputs-evil/a.pdf").unwrap_err();
        assert!(matches!(err, FactoryError::PathEscape { .. }));
    }

    #[test]
    fn absolute_paths_must_already_be_inside() {
        let root = Path::new("/srv/outputs");
        assert!(resolve_output(root, "/srv/outputs/x/a.pdf").is_ok());
        assert!(matches!(
            resolve_output(root, "/etc/passwd").unwrap_err(),
            FactoryError::PathEscape { .. }
        ));
    }

    #[test]
    fn root_itself_is_not_a_file() {
        let root = Path::new("/srv/outputs");
        assert!(matches!(
            resolve_output(root, "x/..").unwrap_err(),
            FactoryError::InvalidJob { .. }
        ));
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let resolved = resolve_output(Path::new("./outputs/"), "a.pdf").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("outputs/a.pdf"));
    }

    #[tokio::test]
    async fn copy_to_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.pdf");
        std::fs::write(&src, b"%PDF-1.4 body").unwrap();
        let dest = dir.path().join("nested/deeper/out.pdf");

        copy_to(&src, &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn install_replaces_existing_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("merged.pdf");
        std::fs::write(&src, b"new").unwrap();
        let dest = dir.path().join("out/final.pdf");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"old").unwrap();

        install(&src, &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert!(!dest.with_extension("pdf.tmp").exists());
    }

    #[tokio::test]
    async fn install_failure_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("final.pdf");
        std::fs::write(&dest, b"old").unwrap();

        let err = install(&dir.path().join("missing.pdf"), &dest).await.unwrap_err();

        assert!(matches!(err, FactoryError::OutputWriteFailed { .. }));
        assert_eq!(std::fs::read(&dest).unwrap(), b"old");
    }
}
