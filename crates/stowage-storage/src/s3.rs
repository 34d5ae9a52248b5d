use crate::buckets::validate_bucket_name;
use crate::keys;
use crate::traits::{
    ensure_upload, ResolveRequest, Resolved, StorageEngine, StorageError, StorageResult,
};
use async_trait::async_trait;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use std::path::Path;
use std::time::Instant;
use stowage_core::constants::{DEFAULT_BUCKET, DEFAULT_REGION, PRIVATE_BUCKET_PREFIX};
use stowage_core::{ObjectStoreConfig, SaveOptions, SavedFile, StorageMode, UploadedFile};

/// Region the client signs with; S3-compatible servers ignore it.
const SIGNING_REGION: &str = "us-east-1";

/// Bucket operations the object store engine needs from an S3-compatible server.
#[async_trait]
pub trait BucketClient: Send + Sync {
    async fn list_buckets(&self) -> StorageResult<Vec<String>>;

    /// Create `bucket` in `region`. Returns `false` when the bucket already exists
    /// (another process won the race).
    async fn make_bucket(&self, bucket: &str, region: &str) -> StorageResult<bool>;

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> StorageResult<()>;

    /// Stream the file at `path` to `bucket/key`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;
}

/// `BucketClient` backed by the AWS SDK, configured for path-style S3-compatible servers.
#[derive(Clone)]
pub struct S3BucketClient {
    client: Client,
}

impl S3BucketClient {
    pub fn new(config: &ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "stowage-object-store",
        );

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(SIGNING_REGION))
            .credentials_provider(credentials)
            .retry_config(retry_config)
            // Path-style addressing is required by MinIO and most self-hosted stores
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl BucketClient for S3BucketClient {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let output = self.client.list_buckets().send().await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to list buckets: {}",
                DisplayErrorContext(&e)
            ))
        })?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> StorageResult<bool> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if region != SIGNING_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if let Some(service_error) = e.as_service_error() {
                    if service_error.is_bucket_already_owned_by_you()
                        || service_error.is_bucket_already_exists()
                    {
                        return Ok(false);
                    }
                }
                Err(StorageError::BackendError(format!(
                    "Failed to create bucket {}: {}",
                    bucket,
                    DisplayErrorContext(&e)
                )))
            }
        }
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> StorageResult<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| {
                StorageError::BackendError(format!(
                    "Failed to set policy on bucket {}: {}",
                    bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let body = ByteStream::from_path(path).await.map_err(|e| {
            StorageError::upload_failed(format!("Failed to open {}: {}", path.display(), e))
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                StorageError::upload_failed(format!(
                    "Failed to upload {}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

/// Public-read policy for every object in `bucket`.
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Action": ["s3:GetObject"],
                "Effect": "Allow",
                "Principal": { "AWS": ["*"] },
                "Resource": [format!("arn:aws:s3:::{}/*", bucket)],
            }
        ]
    })
    .to_string()
}

/// S3-compatible object store engine
///
/// The client is built once at construction and shared by every call.
pub struct ObjectStoreEngine<C: BucketClient = S3BucketClient> {
    client: C,
}

impl ObjectStoreEngine<S3BucketClient> {
    pub fn new(config: &ObjectStoreConfig) -> Self {
        tracing::info!(endpoint = %config.endpoint_url(), "Object store client initialized");
        Self::with_client(S3BucketClient::new(config))
    }
}

impl<C: BucketClient> ObjectStoreEngine<C> {
    pub fn with_client(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create the bucket if it is missing; new public buckets get a public-read policy.
    async fn ensure_bucket(&self, bucket: &str, region: &str) -> StorageResult<()> {
        let existing = self.client.list_buckets().await?;
        if existing.iter().any(|name| name == bucket) {
            return Ok(());
        }

        if !self.client.make_bucket(bucket, region).await? {
            tracing::warn!(bucket = %bucket, "Bucket created concurrently by another client");
            return Ok(());
        }
        tracing::info!(bucket = %bucket, region = %region, "Bucket created");

        if !bucket.starts_with(PRIVATE_BUCKET_PREFIX) {
            self.client
                .set_bucket_policy(bucket, &public_read_policy(bucket))
                .await?;
            tracing::info!(bucket = %bucket, "Public read policy applied");
        }
        Ok(())
    }
}

#[async_trait]
impl<C: BucketClient> StorageEngine for ObjectStoreEngine<C> {
    async fn save_entity(
        &self,
        file: &UploadedFile,
        opts: &SaveOptions,
    ) -> StorageResult<SavedFile> {
        let bucket = opts
            .bucket
            .clone()
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        validate_bucket_name(&bucket)?;
        let prefix = opts.prefix.clone().unwrap_or_else(keys::default_prefix);
        keys::validate_component("prefix", &prefix)?;
        keys::validate_component("filename", &file.filename)?;
        let region = opts
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        ensure_upload(file).await?;

        self.ensure_bucket(&bucket, &region).await?;

        let key = keys::object_key(&prefix, &file.filename);
        let start = Instant::now();
        if let Err(e) = self
            .client
            .put_object(&bucket, &key, &file.path, &file.mimetype)
            .await
        {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Object store upload failed"
            );
            return Err(e);
        }

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store upload successful"
        );

        Ok(SavedFile {
            bucket,
            region,
            prefix,
            mode: StorageMode::ObjectStore,
            mimetype: file.mimetype.clone(),
            filename: file.filename.clone(),
        })
    }

    async fn resolve(&self, request: &ResolveRequest) -> StorageResult<Resolved> {
        // TODO: redirect to the public object URL for buckets carrying the public-read policy
        tracing::warn!(
            bucket = %request.bucket,
            prefix = %request.prefix,
            key = %request.filename,
            "Object store resolve is not implemented, reporting not found"
        );
        Ok(Resolved::NotFound)
    }

    fn mode(&self) -> StorageMode {
        StorageMode::ObjectStore
    }
}
