use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use stowage_storage::{
    BucketClient, FormUploader, StorageError, StorageResult, UploadResponse,
};

/// In-memory S3-compatible server.
#[derive(Default)]
pub struct MemoryBucketClient {
    pub buckets: Mutex<Vec<(String, String)>>,
    pub policies: Mutex<Vec<(String, String)>>,
    pub objects: Mutex<Vec<StoredObject>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MemoryBucketClient {
    pub fn with_bucket(name: &str) -> Self {
        let client = Self::default();
        client
            .buckets
            .lock()
            .unwrap()
            .push((name.to_string(), "local".to_string()));
        client
    }

    pub fn policy_for(&self, bucket: &str) -> Option<String> {
        self.policies
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == bucket)
            .map(|(_, policy)| policy.clone())
    }
}

#[async_trait]
impl BucketClient for MemoryBucketClient {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> StorageResult<bool> {
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.iter().any(|(name, _)| name == bucket) {
            return Ok(false);
        }
        buckets.push((bucket.to_string(), region.to_string()));
        Ok(true)
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> StorageResult<()> {
        self.policies
            .lock()
            .unwrap()
            .push((bucket.to_string(), policy.to_string()));
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let data = tokio::fs::read(path).await?;
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            data,
        });
        Ok(())
    }
}

/// One recorded form upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormUpload {
    pub upload_url: String,
    pub token: String,
    pub key: String,
    pub mimetype: String,
}

/// Provider that answers every upload with a fixed response, or fails the transport.
pub struct ScriptedUploader {
    response: Option<UploadResponse>,
    pub uploads: Mutex<Vec<FormUpload>>,
}

impl ScriptedUploader {
    pub fn answering(status: u16, body: &str) -> Self {
        Self {
            response: Some(UploadResponse {
                status,
                body: body.to_string(),
            }),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            response: None,
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FormUploader for ScriptedUploader {
    async fn put_file(
        &self,
        upload_url: &str,
        token: &str,
        key: &str,
        _path: &Path,
        mimetype: &str,
    ) -> StorageResult<UploadResponse> {
        self.uploads.lock().unwrap().push(FormUpload {
            upload_url: upload_url.to_string(),
            token: token.to_string(),
            key: key.to_string(),
            mimetype: mimetype.to_string(),
        });
        self.response
            .clone()
            .ok_or_else(|| StorageError::upload_failed("connection refused"))
    }
}
