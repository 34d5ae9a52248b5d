//! Stowage Core Library
//!
//! This crate provides the domain model, constants and configuration shared by all
//! Stowage components: the descriptors produced by storage engines, the transform
//! parameters used to address image derivatives, and the environment-driven
//! backend configuration.

pub mod config;
pub mod constants;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{CloudProviderConfig, LocalConfig, ObjectStoreConfig, StorageConfig};
pub use models::{
    FitPolicy, JpegFormat, RecompressSpec, SaveOptions, SavedFile, SpecParseError, ThumbnailSpec,
    TransformSpec, UploadedFile,
};
pub use storage_types::StorageMode;
