//! Where finished clip files go once extraction is done.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::client::R2Client;
use crate::error::{StorageError, StorageResult};

/// Presigned links handed out when the bucket has no public URL.
const PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Takes ownership of a finished clip file and returns its download locator.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn publish(&self, clip_id: &str, file: &Path) -> StorageResult<String>;

    /// Short name for logs and health output.
    fn kind(&self) -> &'static str;
}

/// Serves clips from a local directory through the API.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
    base_url: String,
}

impl LocalArtifactStore {
    /// `base_url` is prepended to `/api/clips/<id>/file`; pass an empty
    /// string for relative locators.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn download_url(&self, clip_id: &str) -> String {
        format!("{}/api/clips/{}/file", self.base_url, clip_id)
    }

    /// Where a published clip lives on disk.
    pub fn path_for(&self, clip_id: &str) -> StorageResult<PathBuf> {
        if clip_id.is_empty()
            || !clip_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::InvalidKey(clip_id.to_string()));
        }
        Ok(self.root.join(format!("clip_{}.mp4", clip_id)))
    }

    /// Path of a published clip, if the file is present.
    pub async fn find(&self, clip_id: &str) -> StorageResult<PathBuf> {
        let path = self.path_for(clip_id)?;
        if tokio::fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(StorageError::not_found(clip_id))
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn publish(&self, clip_id: &str, file: &Path) -> StorageResult<String> {
        let dest = self.path_for(clip_id)?;

        if file != dest {
            tokio::fs::create_dir_all(&self.root).await?;
            if tokio::fs::rename(file, &dest).await.is_err() {
                tokio::fs::copy(file, &dest).await?;
                tokio::fs::remove_file(file).await?;
            }
        }

        if !tokio::fs::try_exists(&dest).await? {
            return Err(StorageError::not_found(dest.display().to_string()));
        }

        Ok(self.download_url(clip_id))
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

/// Uploads clips to R2 and deletes the local copy.
#[derive(Clone)]
pub struct R2ArtifactStore {
    client: R2Client,
    prefix: String,
}

impl R2ArtifactStore {
    pub fn new(client: R2Client) -> Self {
        Self {
            client,
            prefix: "clips".to_string(),
        }
    }

    pub fn client(&self) -> &R2Client {
        &self.client
    }

    pub fn key_for(&self, clip_id: &str, file: &Path) -> String {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("clip_{}.mp4", clip_id));
        format!("{}/{}/{}", self.prefix, clip_id, file_name)
    }
}

#[async_trait]
impl ArtifactStore for R2ArtifactStore {
    async fn publish(&self, clip_id: &str, file: &Path) -> StorageResult<String> {
        let key = self.key_for(clip_id, file);
        self.client.upload_file(file, &key, "video/mp4").await?;

        if let Err(e) = tokio::fs::remove_file(file).await {
            warn!("Failed to remove uploaded clip {}: {}", file.display(), e);
        }

        let url = match self.client.public_url(&key) {
            Some(url) => url,
            None => self.client.presign_get(&key, PRESIGN_TTL).await?,
        };

        info!(clip_id = %clip_id, key = %key, "Published clip to R2");
        Ok(url)
    }

    fn kind(&self) -> &'static str {
        "r2"
    }
}
