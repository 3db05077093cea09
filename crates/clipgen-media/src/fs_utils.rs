//! Filesystem helpers for clip artifacts.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// Tries a rename first and falls back to copy-then-delete on EXDEV. The copy
/// lands in a temporary sibling of `dst` and is renamed into place.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if src == dst {
        return Ok(());
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(18) => {
            debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            let tmp_dst = dst.with_extension("tmp");
            fs::copy(src, &tmp_dst).await?;
            fs::rename(&tmp_dst, dst).await?;
            fs::remove_file(src).await?;
            Ok(())
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Delete a file if it exists. Failures are logged, never returned.
pub async fn remove_if_exists(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_file_same_device() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.mp4");
        let dst = dir.path().join("nested/dest.mp4");

        fs::write(&src, b"video").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_move_file_same_path_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, b"video").await.unwrap();

        move_file(&path, &path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_move_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = move_file(dir.path().join("missing"), dir.path().join("dst")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp.mp4");
        fs::write(&path, b"x").await.unwrap();

        remove_if_exists(&path).await;
        assert!(!path.exists());

        // Second call on a missing file is silent
        remove_if_exists(&path).await;
    }
}
