//! Addressing scheme
//!
//! Pure functions mapping `(bucket, prefix, filename)` to backend keys and local paths,
//! the default `year/month` partition, and the deterministic derivative filename.

use crate::traits::{StorageError, StorageResult};
use chrono::{DateTime, Datelike, Utc};
use std::path::{Path, PathBuf};
use stowage_core::constants::{DERIVATIVE_STEM, TRANSFORMABLE_EXTENSIONS};
use stowage_core::TransformSpec;

/// `{year}/{month0}` partition for `now`; months count from zero (March is `2`).
pub fn year_month_prefix(now: DateTime<Utc>) -> String {
    format!("{}/{}", now.year(), now.month0())
}

/// Partition for the current time.
pub fn default_prefix() -> String {
    year_month_prefix(Utc::now())
}

/// Reject a bucket, prefix or filename that could escape its parent directory.
pub fn validate_component(kind: &str, value: &str) -> StorageResult<()> {
    if value.contains("..") || value.starts_with('/') || value.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "{} '{}' contains invalid characters",
            kind, value
        )));
    }
    Ok(())
}

/// `root/bucket/prefix/filename`
pub fn local_path(root: &Path, bucket: &str, prefix: &str, filename: &str) -> StorageResult<PathBuf> {
    validate_component("bucket", bucket)?;
    validate_component("prefix", prefix)?;
    validate_component("filename", filename)?;

    let mut path = root.join(bucket);
    for segment in prefix.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push(filename);
    Ok(path)
}

/// Object key inside a bucket: `prefix/filename`.
pub fn object_key(prefix: &str, filename: &str) -> String {
    join_key(&[prefix, filename])
}

/// Cloud provider key: `bucket/prefix/filename`.
pub fn provider_key(bucket: &str, prefix: &str, filename: &str) -> String {
    join_key(&[bucket, prefix, filename])
}

fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Extension after the last `.`, if any.
pub fn extension_of(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}

/// Whether the transform pipeline applies to files with this extension.
pub fn is_transformable(extension: &str) -> bool {
    TRANSFORMABLE_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(extension))
}

/// Deterministic derivative name:
/// `compressed[@{thumbnail token}][@{recompress token}].{source extension}`.
pub fn derivative_filename(filename: &str, spec: &TransformSpec) -> String {
    let mut output = String::from(DERIVATIVE_STEM);
    if let Some(thumbnail) = &spec.thumbnail {
        output.push('@');
        output.push_str(&thumbnail.token());
    }
    if let Some(recompress) = &spec.recompress {
        output.push('@');
        output.push_str(&recompress.token());
    }
    if let Some(ext) = extension_of(filename) {
        output.push('.');
        output.push_str(ext);
    }
    output
}

/// Cache location of a derivative: a directory named after the source stem, next to
/// the source. `media/2024/2/cat.png` caches under `media/2024/2/cat/compressed@...png`.
pub fn derivative_path(original: &Path, spec: &TransformSpec) -> PathBuf {
    let filename = original
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    original
        .with_extension("")
        .join(derivative_filename(&filename, spec))
}

/// Content type served for a stored file, by extension.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "md" => "text/markdown",
        _ => "application/octet-stream",
    }
}

/// Content type for a filename; `application/octet-stream` when it has no extension.
pub fn content_type_for(filename: &str) -> &'static str {
    extension_of(filename)
        .map(content_type_for_extension)
        .unwrap_or("application/octet-stream")
}
