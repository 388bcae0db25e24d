use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{CacheEntry, CacheStore};
use crate::error::AppResult;

/// Tag cache persisted as a JSON document on local disk
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent_dir(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self) -> AppResult<Option<CacheEntry>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_str(&contents)?;
        tracing::debug!(
            path = %self.path.display(),
            tags = entry.tags.len(),
            "Loaded tag cache"
        );
        Ok(Some(entry))
    }

    async fn save(&self, entry: &CacheEntry) -> AppResult<()> {
        self.ensure_parent_dir().await?;

        // write-then-rename; each save owns its temp file so concurrent
        // writers replace the document whole, last rename wins
        let json = serde_json::to_vec(entry)?;
        let tmp_path = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!(
            path = %self.path.display(),
            tags = entry.tags.len(),
            "Saved tag cache"
        );
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed tag cache file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
