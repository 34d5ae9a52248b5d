//! Storage descriptors: what callers hand to an engine and what they get back.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{DEFAULT_BUCKET, DEFAULT_REGION};
use crate::storage_types::StorageMode;

/// Result of every store operation.
///
/// `(bucket, prefix, filename)` uniquely addresses one stored object within the backend
/// recorded in `mode`. Created once at upload time and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub prefix: String,
    pub mode: StorageMode,
    pub mimetype: String,
    pub filename: String,
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Bytes handed over by the upload layer: a temp file on local disk, the name the
/// caller assigned to it, and its declared mimetype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub filename: String,
    pub mimetype: String,
}

impl UploadedFile {
    pub fn new(
        path: impl Into<PathBuf>,
        filename: impl Into<String>,
        mimetype: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            filename: filename.into(),
            mimetype: mimetype.into(),
        }
    }
}

/// Optional placement requested by the caller of `save_entity`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub region: Option<String>,
}

impl SaveOptions {
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}
