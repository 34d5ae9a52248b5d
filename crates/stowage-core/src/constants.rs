//! Application-wide constants.

/// Bucket used when neither the caller nor the engine configuration names one.
pub const DEFAULT_BUCKET: &str = "default";

/// Region recorded on descriptors when the caller does not request one.
pub const DEFAULT_REGION: &str = "local";

/// Object-store buckets whose name starts with this prefix never get a public-read policy.
pub const PRIVATE_BUCKET_PREFIX: &str = "private-";

/// Directory (under the storage root) that holds buckets managed by the bucket manager.
pub const BUCKETS_ROOT: &str = "buckets";

/// File stem shared by every cached image derivative.
pub const DERIVATIVE_STEM: &str = "compressed";

/// Extensions eligible for the image transform pipeline.
pub const TRANSFORMABLE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Largest thumbnail width or height accepted in a transform request.
pub const MAX_THUMBNAIL_DIMENSION: u32 = 8192;

/// JPEG quality used when a JPEG derivative is produced without an explicit recompress spec.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
