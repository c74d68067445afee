//! Media-path resolution for path-accepting endpoints (spec §4.K):
//! resolve the absolute real path, deny symlinks and paths outside a
//! configured media-root set.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why a media path was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaPathError {
    /// The path does not exist or could not be canonicalized.
    #[error("path not found: {0}")]
    NotFound(String),
    /// Canonicalizing the path required following a symlink.
    #[error("symlinks are not permitted: {0}")]
    SymlinkDenied(String),
    /// The resolved path is outside every configured media root.
    #[error("path escapes the configured media roots: {0}")]
    OutsideRoots(String),
}

/// Resolve `requested` to its real, canonical path and confirm it sits
/// under one of `roots` without crossing a symlink to get there.
///
/// # Errors
///
/// Returns [`MediaPathError`] on any of the conditions above.
pub fn resolve_media_path(requested: &Path, roots: &[PathBuf]) -> Result<PathBuf, MediaPathError> {
    let canonical = std::fs::canonicalize(requested)
        .map_err(|_| MediaPathError::NotFound(requested.display().to_string()))?;

    if is_symlink(requested) {
        return Err(MediaPathError::SymlinkDenied(requested.display().to_string()));
    }

    if roots.is_empty() || roots.iter().any(|root| canonical.starts_with(root)) {
        Ok(canonical)
    } else {
        Err(MediaPathError::OutsideRoots(canonical.display().to_string()))
    }
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn plain_file_within_root_resolves() {
        let dir = tempfile_dir();
        let file = dir.join("a.jpg");
        std::fs::File::create(&file).unwrap().write_all(b"x").unwrap();

        let resolved = resolve_media_path(&file, &[dir.clone()]).unwrap();
        assert_eq!(resolved, file.canonicalize().unwrap());
    }

    #[test]
    fn file_outside_roots_is_denied() {
        let dir = tempfile_dir();
        let other = tempfile_dir();
        let file = other.join("a.jpg");
        std::fs::File::create(&file).unwrap().write_all(b"x").unwrap();

        let err = resolve_media_path(&file, &[dir]).unwrap_err();
        assert!(matches!(err, MediaPathError::OutsideRoots(_)));
    }

    #[test]
    fn symlink_is_denied() {
        let dir = tempfile_dir();
        let target = dir.join("real.jpg");
        std::fs::File::create(&target).unwrap().write_all(b"x").unwrap();
        let link = dir.join("link.jpg");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &link).unwrap();

        #[cfg(unix)]
        {
            let err = resolve_media_path(&link, &[dir]).unwrap_err();
            assert!(matches!(err, MediaPathError::SymlinkDenied(_)));
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile_dir();
        let err = resolve_media_path(&dir.join("nope.jpg"), &[dir]).unwrap_err();
        assert!(matches!(err, MediaPathError::NotFound(_)));
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("astrid-broker-test-{}", std::process::id())).join(nanos());
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn nanos() -> String {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        COUNTER.fetch_add(1, Ordering::SeqCst).to_string()
    }
}
