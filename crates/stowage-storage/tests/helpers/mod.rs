#![allow(dead_code)]

pub mod fixtures;
pub mod remote;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stowage_core::{LocalConfig, TransformSpec, UploadedFile};
use stowage_processing::{DerivativeRenderer, ImageTransformer};
use stowage_storage::{LocalDiskEngine, ResolveSink, StorageResult};
use tempfile::TempDir;

/// Local engine rooted in a fresh temp dir, with a renderer that counts its runs.
pub struct TestDisk {
    pub dir: TempDir,
    pub engine: LocalDiskEngine,
    pub renderer: Arc<CountingRenderer>,
}

impl TestDisk {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalConfig {
            storage_path: dir.path().to_path_buf(),
            default_bucket: "default".to_string(),
        };
        let renderer = Arc::new(CountingRenderer::default());
        let engine = LocalDiskEngine::new(&config)
            .await
            .unwrap()
            .with_renderer(renderer.clone());
        Self {
            dir,
            engine,
            renderer,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `data` to a temp upload file and describe it.
    pub fn upload(&self, filename: &str, mimetype: &str, data: &[u8]) -> UploadedFile {
        let incoming = self.dir.path().join("incoming");
        std::fs::create_dir_all(&incoming).unwrap();
        let path = incoming.join(format!("{}.upload", filename));
        std::fs::write(&path, data).unwrap();
        UploadedFile::new(path, filename, mimetype)
    }
}

/// Real image pipeline plus a run counter. Sleeps briefly so concurrent callers overlap.
#[derive(Default)]
pub struct CountingRenderer {
    runs: AtomicUsize,
}

impl CountingRenderer {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl DerivativeRenderer for CountingRenderer {
    fn render(
        &self,
        source: &[u8],
        extension: &str,
        spec: &TransformSpec,
    ) -> Result<Bytes, anyhow::Error> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        ImageTransformer.render(source, extension, spec)
    }
}

/// What a sink was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    File(PathBuf, String),
    Bytes(Bytes, String),
    Redirect(String),
    NotFound,
}

/// Sink that records deliveries.
#[derive(Default)]
pub struct RecordingSink {
    pub deliveries: Vec<Delivery>,
}

#[async_trait]
impl ResolveSink for RecordingSink {
    async fn send_file(&mut self, path: &Path, content_type: &str) -> StorageResult<()> {
        self.deliveries
            .push(Delivery::File(path.to_path_buf(), content_type.to_string()));
        Ok(())
    }

    async fn send_bytes(&mut self, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.deliveries
            .push(Delivery::Bytes(data, content_type.to_string()));
        Ok(())
    }

    async fn redirect(&mut self, url: &str) -> StorageResult<()> {
        self.deliveries.push(Delivery::Redirect(url.to_string()));
        Ok(())
    }

    async fn not_found(&mut self) -> StorageResult<()> {
        self.deliveries.push(Delivery::NotFound);
        Ok(())
    }
}
