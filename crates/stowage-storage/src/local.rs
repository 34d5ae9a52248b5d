use crate::keys;
use crate::traits::{
    ensure_upload, ResolveRequest, Resolved, StorageEngine, StorageError, StorageResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use stowage_core::constants::DEFAULT_REGION;
use stowage_core::{
    LocalConfig, SaveOptions, SavedFile, StorageMode, TransformSpec, UploadedFile,
};
use stowage_processing::{DerivativeRenderer, ImageTransformer};
use tokio::fs;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage engine
///
/// Originals live at `root/bucket/prefix/filename`; derivatives are cached in a
/// directory named after the source stem, under their deterministic `compressed@...` name.
pub struct LocalDiskEngine {
    root: PathBuf,
    default_bucket: String,
    renderer: Arc<dyn DerivativeRenderer>,
    inflight: DerivativeLocks,
}

impl LocalDiskEngine {
    /// Create a new engine rooted at `config.storage_path`
    ///
    /// The default bucket directory is created eagerly.
    pub async fn new(config: &LocalConfig) -> StorageResult<Self> {
        keys::validate_component("bucket", &config.default_bucket)?;
        let root = config.storage_path.clone();
        let default_dir = root.join(&config.default_bucket);

        fs::create_dir_all(&default_dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                default_dir.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %root.display(),
            bucket = %config.default_bucket,
            "Local storage initialized"
        );

        Ok(Self {
            root,
            default_bucket: config.default_bucket.clone(),
            renderer: Arc::new(ImageTransformer::new()),
            inflight: DerivativeLocks::default(),
        })
    }

    /// Replace the derivative renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn DerivativeRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    async fn serve_original(&self, path: &Path, filename: &str) -> StorageResult<Resolved> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(Resolved::File {
                path: path.to_path_buf(),
                content_type: keys::content_type_for(filename).to_string(),
            }),
            Ok(_) => Ok(Resolved::NotFound),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Original not found");
                Ok(Resolved::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cache miss path. Runs under the per-derivative lock.
    async fn render_derivative(
        &self,
        original: &Path,
        derivative: &Path,
        extension: &str,
        spec: &TransformSpec,
        content_type: &str,
    ) -> StorageResult<Resolved> {
        // Another caller may have produced it while we waited for the lock.
        if fs::try_exists(derivative).await.unwrap_or(false) {
            tracing::debug!(path = %derivative.display(), "Derivative produced by concurrent request");
            return Ok(Resolved::File {
                path: derivative.to_path_buf(),
                content_type: content_type.to_string(),
            });
        }

        let source = match fs::read(original).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %original.display(), "Derivative source not found");
                return Ok(Resolved::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(dir) = derivative.parent() {
            fs::create_dir_all(dir).await?;
        }

        let start = Instant::now();
        let renderer = Arc::clone(&self.renderer);
        let ext = extension.to_string();
        let spec = *spec;
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&source, &ext, &spec))
            .await
            .map_err(|e| StorageError::TransformFailed(format!("Transform task failed: {}", e)))?
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    path = %original.display(),
                    "Image transform failed"
                );
                StorageError::TransformFailed(format!("{}: {}", original.display(), e))
            })?;

        let temp = temp_path_for(derivative);
        if let Err(e) = fs::write(&temp, &rendered).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp, derivative).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::info!(
            path = %derivative.display(),
            size_bytes = rendered.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Derivative generated"
        );

        Ok(Resolved::File {
            path: derivative.to_path_buf(),
            content_type: content_type.to_string(),
        })
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight.len()
    }
}

#[async_trait]
impl StorageEngine for LocalDiskEngine {
    async fn save_entity(
        &self,
        file: &UploadedFile,
        opts: &SaveOptions,
    ) -> StorageResult<SavedFile> {
        ensure_upload(file).await?;

        let bucket = opts
            .bucket
            .clone()
            .unwrap_or_else(|| self.default_bucket.clone());
        let prefix = opts.prefix.clone().unwrap_or_else(keys::default_prefix);
        let region = opts
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let dest = keys::local_path(&self.root, &bucket, &prefix, &file.filename)?;

        let start = Instant::now();
        move_into_place(&file.path, &dest).await?;

        tracing::info!(
            bucket = %bucket,
            prefix = %prefix,
            path = %dest.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage save successful"
        );

        Ok(SavedFile {
            bucket,
            region,
            prefix,
            mode: StorageMode::Local,
            mimetype: file.mimetype.clone(),
            filename: file.filename.clone(),
        })
    }

    async fn resolve(&self, request: &ResolveRequest) -> StorageResult<Resolved> {
        let original = keys::local_path(
            &self.root,
            &request.bucket,
            &request.prefix,
            &request.filename,
        )?;
        let extension = keys::extension_of(&request.filename).unwrap_or_default();

        let spec = match request.transform {
            Some(spec) if !spec.is_empty() && keys::is_transformable(extension) => spec,
            _ => return self.serve_original(&original, &request.filename).await,
        };

        let derivative = keys::derivative_path(&original, &spec);
        let content_type = keys::content_type_for_extension(extension);

        if fs::try_exists(&derivative).await.unwrap_or(false) {
            tracing::debug!(path = %derivative.display(), "Derivative cache hit");
            return Ok(Resolved::File {
                path: derivative,
                content_type: content_type.to_string(),
            });
        }

        tracing::debug!(path = %derivative.display(), "Derivative cache miss");
        let entry = self.inflight.enter(&derivative);
        let _guard = entry.lock().await;
        self.render_derivative(&original, &derivative, extension, &spec, content_type)
            .await
    }

    fn mode(&self) -> StorageMode {
        StorageMode::Local
    }
}

/// Per-derivative async locks. Entries are dropped once nobody holds or waits on them.
#[derive(Default)]
struct DerivativeLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl DerivativeLocks {
    fn enter(&self, key: &Path) -> InflightEntry<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = Arc::clone(locks.entry(key.to_path_buf()).or_default());
        InflightEntry {
            locks: self,
            key: key.to_path_buf(),
            lock: Some(lock),
        }
    }

    fn release(&self, key: &Path) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(key) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A caller's stake in one derivative lock. Releases the table entry on drop, including
/// when the owning `resolve` future is cancelled while waiting.
struct InflightEntry<'a> {
    locks: &'a DerivativeLocks,
    key: PathBuf,
    lock: Option<Arc<tokio::sync::Mutex<()>>>,
}

impl InflightEntry<'_> {
    /// `None` never happens before drop.
    async fn lock(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        let lock = self.lock.as_ref()?;
        Some(lock.lock().await)
    }
}

impl Drop for InflightEntry<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        self.locks.release(&self.key);
    }
}

/// Sibling temp file, hidden and unique per write.
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(".{}.{}-{}.tmp", name, std::process::id(), seq))
}

/// Move `src` to `dest`, creating parent directories. Falls back to copy + remove when
/// a rename is not possible (e.g. across filesystems).
pub(crate) async fn move_into_place(src: &Path, dest: &Path) -> StorageResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    if fs::rename(src, dest).await.is_ok() {
        return Ok(());
    }

    fs::copy(src, dest).await.map_err(|e| {
        tracing::error!(
            error = %e,
            from = %src.display(),
            path = %dest.display(),
            "Failed to move upload into place"
        );
        e
    })?;
    fs::remove_file(src).await?;
    Ok(())
}
