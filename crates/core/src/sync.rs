//! Mirror a local directory tree into a bucket

use crate::backend::{ObjectUpload, StorageBackend};
use crate::error::{Error, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// Content type used when the extension is unknown
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Outcome of a sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: usize,
    pub bytes: u64,
}

/// Uploads every regular file below a root directory
pub struct StorageSync {
    storage: Arc<dyn StorageBackend>,
    concurrency: usize,
}

/// Guess the content type of a key from its extension
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Object key of `path` relative to `root`, always `/` separated
pub fn object_key(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::InvalidInput(format!("{} is not below {}", path.display(), root.display()))
    })?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().map(str::to_string).ok_or_else(|| {
                Error::InvalidInput(format!("{} is not valid UTF-8", path.display()))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(parts.join("/"))
}

impl StorageSync {
    pub fn new(storage: Arc<dyn StorageBackend>, concurrency: usize) -> Self {
        Self {
            storage,
            concurrency: concurrency.max(1),
        }
    }

    /// Walk `root` and describe the upload of every regular file
    pub fn plan(&self, root: &Path, bucket: &str) -> Result<Vec<ObjectUpload>> {
        if !root.is_dir() {
            return Err(Error::InvalidInput(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut uploads = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let key = object_key(root, entry.path())?;
            let size = entry.metadata()?.len();
            uploads.push(ObjectUpload {
                bucket: bucket.to_string(),
                content_type: content_type_for(&key),
                key,
                path: entry.path().to_path_buf(),
                size,
                public_read: true,
            });
        }

        tracing::debug!("Planned {} uploads from {}", uploads.len(), root.display());
        Ok(uploads)
    }

    /// Upload planned files, calling `on_uploaded` after each success.
    ///
    /// Stops at the first failed upload; uploads already in flight may still
    /// complete.
    pub async fn upload_all<F>(&self, uploads: &[ObjectUpload], on_uploaded: F) -> Result<SyncReport>
    where
        F: Fn(&ObjectUpload),
    {
        stream::iter(uploads.iter().map(|upload| async move {
            tracing::debug!("Uploading {} ({})", upload.key, upload.content_type);
            self.storage.upload_object(upload).await.map(|_| upload)
        }))
        .buffer_unordered(self.concurrency)
        .try_fold(SyncReport::default(), |mut report, upload| {
            on_uploaded(upload);
            report.uploaded += 1;
            report.bytes += upload.size;
            async move { Ok(report) }
        })
        .await
    }

    /// Upload the whole tree below `root` into `bucket`
    pub async fn sync(&self, root: &Path, bucket: &str) -> Result<SyncReport> {
        let uploads = self.plan(root, bucket)?;
        let report = self.upload_all(&uploads, |_| {}).await?;

        tracing::info!(
            "Synced {} files ({} bytes) to {}",
            report.uploaded,
            report.bytes,
            bucket
        );
        Ok(report)
    }
}
