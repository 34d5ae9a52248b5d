//! Shared pieces of the `stowage` binary: logging setup, upload staging and the resolve
//! transport.

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::path::{Path, PathBuf};
use stowage_core::UploadedFile;
use stowage_storage::keys::content_type_for;
use stowage_storage::{ResolveSink, StorageResult};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Private copy of a user file handed to an engine, which moves it into storage.
/// Whatever is left at the temp path is removed on drop.
pub struct StagedUpload {
    pub upload: UploadedFile,
    _path: TempPath,
}

/// Copy `file` to a fresh temp path. `filename` (default: the source file name) is only
/// the stored name and never becomes part of the temp path.
pub async fn stage_upload(
    file: &Path,
    filename: Option<String>,
    mimetype: Option<String>,
) -> anyhow::Result<StagedUpload> {
    let filename = match filename {
        Some(name) => name,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", file.display()))?,
    };
    let mimetype = mimetype.unwrap_or_else(|| content_type_for(&filename).to_string());

    let staged = tempfile::Builder::new()
        .prefix("stowage-")
        .tempfile()
        .context("Failed to create staging file")?
        .into_temp_path();
    tokio::fs::copy(file, &staged)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    Ok(StagedUpload {
        upload: UploadedFile::new(staged.to_path_buf(), filename, mimetype),
        _path: staged,
    })
}

/// Report printed after a resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveOutcome {
    File {
        path: PathBuf,
        content_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        written_to: Option<PathBuf>,
        size_bytes: u64,
    },
    Bytes {
        content_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        written_to: Option<PathBuf>,
        size_bytes: u64,
    },
    Redirect {
        url: String,
    },
    NotFound,
}

/// Transport adapter: copies resolved content to `out` (or stdout for in-memory
/// bytes) and keeps a report of what happened.
#[derive(Debug, Default)]
pub struct OutputSink {
    out: Option<PathBuf>,
    outcome: Option<ResolveOutcome>,
}

impl OutputSink {
    pub fn new(out: Option<PathBuf>) -> Self {
        Self { out, outcome: None }
    }

    pub fn outcome(&self) -> Option<&ResolveOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<ResolveOutcome> {
        self.outcome
    }
}

#[async_trait]
impl ResolveSink for OutputSink {
    async fn send_file(&mut self, path: &Path, content_type: &str) -> StorageResult<()> {
        let size_bytes = match &self.out {
            Some(out) => tokio::fs::copy(path, out).await?,
            None => tokio::fs::metadata(path).await?.len(),
        };
        self.outcome = Some(ResolveOutcome::File {
            path: path.to_path_buf(),
            content_type: content_type.to_string(),
            written_to: self.out.clone(),
            size_bytes,
        });
        Ok(())
    }

    async fn send_bytes(&mut self, data: Bytes, content_type: &str) -> StorageResult<()> {
        match &self.out {
            Some(out) => tokio::fs::write(out, &data).await?,
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&data).await?;
                stdout.flush().await?;
            }
        }
        self.outcome = Some(ResolveOutcome::Bytes {
            content_type: content_type.to_string(),
            written_to: self.out.clone(),
            size_bytes: data.len() as u64,
        });
        Ok(())
    }

    async fn redirect(&mut self, url: &str) -> StorageResult<()> {
        self.outcome = Some(ResolveOutcome::Redirect {
            url: url.to_string(),
        });
        Ok(())
    }

    async fn not_found(&mut self) -> StorageResult<()> {
        self.outcome = Some(ResolveOutcome::NotFound);
        Ok(())
    }
}
