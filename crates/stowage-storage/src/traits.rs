//! Storage abstraction trait
//!
//! This module defines the StorageEngine trait that all storage backends implement,
//! the content descriptor returned by reads, and the sink that transports it.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use stowage_core::{SaveOptions, SavedFile, StorageMode, TransformSpec, UploadedFile};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File required: {0}")]
    FileRequired(String),

    #[error("Invalid bucket name: '{0}'")]
    BucketNameInvalid(String),

    #[error("Bucket name cannot be a path: {0}")]
    BucketNameIsPath(String),

    #[error("Upload failed: {message}")]
    UploadFailed {
        message: String,
        /// HTTP status reported by the provider, when one was received.
        status: Option<u16>,
        /// Raw provider response payload, kept for diagnostics.
        body: Option<String>,
    },

    #[error("Transform failed: {0}")]
    TransformFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Upload failure without a provider response (transport or local read error).
    pub fn upload_failed(message: impl Into<String>) -> Self {
        StorageError::UploadFailed {
            message: message.into(),
            status: None,
            body: None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Read request: the address of a stored file plus optional transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub filename: String,
    pub bucket: String,
    pub prefix: String,
    pub transform: Option<TransformSpec>,
}

impl ResolveRequest {
    pub fn new(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            bucket: bucket.into(),
            prefix: prefix.into(),
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: TransformSpec) -> Self {
        self.transform = Some(transform);
        self
    }
}

impl From<&SavedFile> for ResolveRequest {
    fn from(saved: &SavedFile) -> Self {
        ResolveRequest::new(&saved.bucket, &saved.prefix, &saved.filename)
    }
}

/// What a read produced. Transport adapters turn this into a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Serve a file from local disk.
    File { path: PathBuf, content_type: String },
    /// Serve in-memory bytes.
    Bytes { data: Bytes, content_type: String },
    /// Send the client elsewhere.
    Redirect { url: String },
    /// No original and no cached derivative.
    NotFound,
}

impl Resolved {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Resolved::NotFound)
    }

    /// Hand the descriptor to a transport sink.
    pub async fn deliver(self, sink: &mut dyn ResolveSink) -> StorageResult<()> {
        match self {
            Resolved::File { path, content_type } => sink.send_file(&path, &content_type).await,
            Resolved::Bytes { data, content_type } => sink.send_bytes(data, &content_type).await,
            Resolved::Redirect { url } => sink.redirect(&url).await,
            Resolved::NotFound => sink.not_found().await,
        }
    }
}

/// Transport for resolved content ("send bytes with a content type", "redirect",
/// "not found"). Keeps engines independent of HTTP or any other transport.
#[async_trait]
pub trait ResolveSink: Send {
    async fn send_file(&mut self, path: &Path, content_type: &str) -> StorageResult<()>;

    async fn send_bytes(&mut self, data: Bytes, content_type: &str) -> StorageResult<()>;

    async fn redirect(&mut self, url: &str) -> StorageResult<()>;

    async fn not_found(&mut self) -> StorageResult<()>;
}

/// Storage engine contract
///
/// Every backend (local disk, S3-compatible object store, token-authenticated cloud
/// provider) implements the same two operations: store an uploaded file and resolve
/// a stored file, optionally through the image transform pipeline.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Store `file` durably and return its descriptor.
    ///
    /// `prefix` defaults to the `year/month` partition of the call time.
    async fn save_entity(&self, file: &UploadedFile, opts: &SaveOptions)
        -> StorageResult<SavedFile>;

    /// Resolve a stored file (or its derivative) into a content descriptor.
    /// A missing file is `Ok(Resolved::NotFound)`, not an error.
    async fn resolve(&self, request: &ResolveRequest) -> StorageResult<Resolved>;

    /// Backend this engine writes to
    fn mode(&self) -> StorageMode;

    /// Resolve and deliver the result to `sink`.
    async fn resolve_into(
        &self,
        request: &ResolveRequest,
        sink: &mut dyn ResolveSink,
    ) -> StorageResult<()> {
        self.resolve(request).await?.deliver(sink).await
    }
}

/// Check the upload descriptor, then that its bytes exist on disk.
pub(crate) async fn ensure_upload(file: &UploadedFile) -> StorageResult<()> {
    if file.filename.is_empty() {
        return Err(StorageError::FileRequired(
            "upload has no assigned filename".to_string(),
        ));
    }
    if file.path.as_os_str().is_empty() {
        return Err(StorageError::FileRequired(format!(
            "upload '{}' has no source path",
            file.filename
        )));
    }
    if !tokio::fs::try_exists(&file.path).await.unwrap_or(false) {
        return Err(StorageError::FileRequired(format!(
            "upload source {} does not exist",
            file.path.display()
        )));
    }
    Ok(())
}
