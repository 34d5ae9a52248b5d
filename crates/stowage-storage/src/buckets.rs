//! Local bucket lifecycle under `root/buckets/<name>`, independent of the disk engine.

use crate::keys;
use crate::local::move_into_place;
use crate::traits::{ensure_upload, StorageError, StorageResult};
use std::path::{Path, PathBuf};
use stowage_core::constants::{BUCKETS_ROOT, DEFAULT_REGION};
use stowage_core::{SavedFile, StorageMode, UploadedFile};
use tokio::fs;

/// Validate a bucket name: non-empty, not a path.
pub fn validate_bucket_name(name: &str) -> StorageResult<()> {
    if name.trim().is_empty() || name == "." || name == ".." {
        return Err(StorageError::BucketNameInvalid(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(StorageError::BucketNameIsPath(name.to_string()));
    }
    Ok(())
}

pub struct BucketManager {
    buckets_root: PathBuf,
}

impl BucketManager {
    pub async fn new(storage_path: impl AsRef<Path>) -> StorageResult<Self> {
        let buckets_root = storage_path.as_ref().join(BUCKETS_ROOT);
        fs::create_dir_all(&buckets_root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create bucket directory {}: {}",
                buckets_root.display(),
                e
            ))
        })?;
        tracing::info!(path = %buckets_root.display(), "Bucket storage initialized");
        Ok(Self { buckets_root })
    }

    pub fn buckets_root(&self) -> &Path {
        &self.buckets_root
    }

    /// Names of all bucket directories, sorted.
    pub async fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.buckets_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a bucket. Creating an existing bucket is a no-op.
    pub async fn create(&self, name: &str) -> StorageResult<()> {
        validate_bucket_name(name)?;
        fs::create_dir_all(self.buckets_root.join(name)).await?;
        tracing::info!(bucket = %name, "Bucket created");
        Ok(())
    }

    /// Remove an empty bucket.
    pub async fn delete(&self, name: &str) -> StorageResult<()> {
        validate_bucket_name(name)?;
        let path = self.buckets_root.join(name);
        fs::remove_dir(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("bucket '{}'", name))
            } else {
                tracing::error!(error = %e, bucket = %name, "Failed to delete bucket");
                StorageError::IoError(e)
            }
        })?;
        tracing::info!(bucket = %name, "Bucket deleted");
        Ok(())
    }

    /// Paths of every file stored in the bucket, relative to it, `/`-separated and sorted.
    pub async fn list_entities(&self, name: &str) -> StorageResult<Vec<String>> {
        validate_bucket_name(name)?;
        let bucket_root = self.buckets_root.join(name);
        if !fs::try_exists(&bucket_root).await.unwrap_or(false) {
            return Err(StorageError::NotFound(format!("bucket '{}'", name)));
        }

        let mut entities = Vec::new();
        let mut pending = vec![bucket_root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&bucket_root) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    entities.push(parts.join("/"));
                }
            }
        }
        entities.sort();
        Ok(entities)
    }

    /// Store `file` under the bucket's current `year/month` partition.
    ///
    /// The descriptor's bucket is `buckets/<name>`, so a disk engine rooted at the
    /// same storage path resolves it.
    pub async fn save(&self, name: &str, file: &UploadedFile) -> StorageResult<SavedFile> {
        validate_bucket_name(name)?;
        ensure_upload(file).await?;

        let prefix = keys::default_prefix();
        let dest = keys::local_path(&self.buckets_root, name, &prefix, &file.filename)?;
        move_into_place(&file.path, &dest).await?;

        tracing::info!(
            bucket = %name,
            prefix = %prefix,
            path = %dest.display(),
            "Bucket entity saved"
        );

        Ok(SavedFile {
            bucket: format!("{}/{}", BUCKETS_ROOT, name),
            region: DEFAULT_REGION.to_string(),
            prefix,
            mode: StorageMode::Local,
            mimetype: file.mimetype.clone(),
            filename: file.filename.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_bucket_name() {
        assert!(matches!(
            validate_bucket_name(""),
            Err(StorageError::BucketNameInvalid(_))
        ));
        assert!(matches!(
            validate_bucket_name(".."),
            Err(StorageError::BucketNameInvalid(_))
        ));
        assert!(matches!(
            validate_bucket_name("a/b"),
            Err(StorageError::BucketNameIsPath(_))
        ));
        assert!(matches!(
            validate_bucket_name("a\\b"),
            Err(StorageError::BucketNameIsPath(_))
        ));
        assert!(validate_bucket_name("media").is_ok());
    }

    #[tokio::test]
    async fn test_delete_only_removes_empty_bucket() {
        let dir = tempdir().unwrap();
        let manager = BucketManager::new(dir.path()).await.unwrap();
        manager.create("full").await.unwrap();
        tokio::fs::write(manager.buckets_root().join("full/a.txt"), b"a")
            .await
            .unwrap();

        assert!(matches!(
            manager.delete("full").await,
            Err(StorageError::IoError(_))
        ));
        assert!(matches!(
            manager.delete("absent").await,
            Err(StorageError::NotFound(_))
        ));

        manager.create("empty").await.unwrap();
        manager.delete("empty").await.unwrap();
        assert_eq!(manager.list().await.unwrap(), vec!["full".to_string()]);
    }

    #[tokio::test]
    async fn test_list_entities_is_recursive_and_sorted() {
        let dir = tempdir().unwrap();
        let manager = BucketManager::new(dir.path()).await.unwrap();
        manager.create("docs").await.unwrap();
        let root = manager.buckets_root().join("docs");
        tokio::fs::create_dir_all(root.join("2024/2")).await.unwrap();
        tokio::fs::write(root.join("2024/2/b.txt"), b"b").await.unwrap();
        tokio::fs::write(root.join("a.txt"), b"a").await.unwrap();

        let entities = manager.list_entities("docs").await.unwrap();
        assert_eq!(entities, vec!["2024/2/b.txt".to_string(), "a.txt".to_string()]);
    }
}
