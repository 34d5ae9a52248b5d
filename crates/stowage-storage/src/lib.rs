//! Stowage Storage Library
//!
//! Storage engines behind one [`StorageEngine`] contract: local disk (with lazily
//! cached image derivatives), an S3-compatible object store and a token-authenticated
//! cloud provider, plus the local [`BucketManager`].
//!
//! # Addressing
//!
//! Every stored object is addressed by `(bucket, prefix, filename)`; the prefix
//! defaults to the `{year}/{month0}` partition of the upload time.
//!
//! - **Local disk**: `root/{bucket}/{prefix}/{filename}`
//! - **Object store**: bucket `{bucket}`, key `{prefix}/{filename}`
//! - **Cloud provider**: key `{bucket}/{prefix}/{filename}` in the configured provider bucket
//!
//! Derivatives are cached in a directory named after their source's stem, as
//! `{stem}/compressed[@{thumbnail}][@{recompress}].{ext}`. Components must not contain `..`
//! or a leading `/`. Key generation is centralized in the `keys` module.

pub mod buckets;
#[cfg(feature = "storage-cloud-provider")]
pub mod cloud;
pub mod factory;
pub mod keys;
pub mod local;
#[cfg(feature = "storage-object-store")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use buckets::{validate_bucket_name, BucketManager};
#[cfg(feature = "storage-cloud-provider")]
pub use cloud::{
    CloudProviderEngine, FormUploader, HttpFormUploader, UploadResponse, UploadTokenSigner,
};
pub use factory::{create_engine, Engine};
pub use local::LocalDiskEngine;
#[cfg(feature = "storage-object-store")]
pub use s3::{BucketClient, ObjectStoreEngine, S3BucketClient};
pub use stowage_core::StorageMode;
pub use traits::{
    ResolveRequest, ResolveSink, Resolved, StorageEngine, StorageError, StorageResult,
};
