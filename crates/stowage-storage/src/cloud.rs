//! Token-authenticated cloud provider engine.
//!
//! Every upload carries a short-lived token scoped to the configured provider bucket:
//! `access_key:base64url(HMAC-SHA256(secret_key, encoded_policy)):encoded_policy`, where
//! `encoded_policy = base64url({"scope": bucket, "deadline": unix_ts})`.

use crate::keys;
use crate::traits::{
    ensure_upload, ResolveRequest, Resolved, StorageEngine, StorageError, StorageResult,
};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::Path;
use std::time::{Duration, Instant};
use stowage_core::constants::DEFAULT_REGION;
use stowage_core::{CloudProviderConfig, SaveOptions, SavedFile, StorageMode, UploadedFile};

const UPLOAD_TOKEN_TTL_SECS: i64 = 3600;
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Long-lived signing credential, built once per engine.
#[derive(Clone)]
pub struct UploadTokenSigner {
    access_key: String,
    secret_key: String,
}

impl UploadTokenSigner {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Mint an upload token limited to `scope` and valid until `deadline` (unix seconds).
    pub fn upload_token(&self, scope: &str, deadline: i64) -> StorageResult<String> {
        let policy = serde_json::json!({ "scope": scope, "deadline": deadline }).to_string();
        let encoded_policy = URL_SAFE.encode(policy.as_bytes());

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| StorageError::ConfigError(format!("Invalid signing key: {}", e)))?;
        mac.update(encoded_policy.as_bytes());
        let signature = URL_SAFE.encode(mac.finalize().into_bytes());

        Ok(format!("{}:{}:{}", self.access_key, signature, encoded_policy))
    }
}

/// What the provider answered to an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Form upload transport. A transport failure is an error; any HTTP answer is a
/// response, whatever its status.
#[async_trait]
pub trait FormUploader: Send + Sync {
    async fn put_file(
        &self,
        upload_url: &str,
        token: &str,
        key: &str,
        path: &Path,
        mimetype: &str,
    ) -> StorageResult<UploadResponse>;
}

/// Multipart form uploader over `reqwest`.
#[derive(Clone)]
pub struct HttpFormUploader {
    client: reqwest::Client,
}

impl HttpFormUploader {
    pub fn new() -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FormUploader for HttpFormUploader {
    async fn put_file(
        &self,
        upload_url: &str,
        token: &str,
        key: &str,
        path: &Path,
        mimetype: &str,
    ) -> StorageResult<UploadResponse> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            StorageError::upload_failed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file_name = key.rsplit('/').next().unwrap_or(key).to_string();
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(mimetype)
            .map_err(|e| StorageError::upload_failed(format!("Invalid mimetype: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("token", token.to_string())
            .text("key", key.to_string())
            .part("file", part);

        let response = self
            .client
            .post(upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("Upload of '{}' failed: {}", key, e)))?;

        let status = response.status().as_u16();
        let body = response_body(key, response.text().await);
        Ok(UploadResponse { status, body })
    }
}

/// Response text, or a note describing why it could not be read.
fn response_body<E: std::fmt::Display>(key: &str, text: Result<String, E>) -> String {
    match text {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, key = %key, "Failed to read upload response body");
            format!("<unreadable response body: {}>", e)
        }
    }
}

/// Cloud provider storage engine
pub struct CloudProviderEngine<U: FormUploader = HttpFormUploader> {
    config: CloudProviderConfig,
    signer: UploadTokenSigner,
    uploader: U,
}

impl CloudProviderEngine<HttpFormUploader> {
    pub fn new(config: &CloudProviderConfig) -> StorageResult<Self> {
        Ok(Self::with_uploader(config, HttpFormUploader::new()?))
    }
}

impl<U: FormUploader> CloudProviderEngine<U> {
    pub fn with_uploader(config: &CloudProviderConfig, uploader: U) -> Self {
        tracing::info!(
            bucket = %config.bucket,
            prefix = %config.prefix,
            "Cloud provider storage initialized"
        );
        Self {
            config: config.clone(),
            signer: UploadTokenSigner::new(&config.access_key, &config.secret_key),
            uploader,
        }
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }
}

#[async_trait]
impl<U: FormUploader> StorageEngine for CloudProviderEngine<U> {
    async fn save_entity(
        &self,
        file: &UploadedFile,
        opts: &SaveOptions,
    ) -> StorageResult<SavedFile> {
        let logical_bucket = opts
            .bucket
            .clone()
            .unwrap_or_else(|| self.config.prefix.clone());
        let prefix = opts.prefix.clone().unwrap_or_else(keys::default_prefix);
        keys::validate_component("bucket", &logical_bucket)?;
        keys::validate_component("prefix", &prefix)?;
        keys::validate_component("filename", &file.filename)?;
        ensure_upload(file).await?;

        let key = keys::provider_key(&logical_bucket, &prefix, &file.filename);
        let deadline = chrono::Utc::now().timestamp() + UPLOAD_TOKEN_TTL_SECS;
        let token = self.signer.upload_token(&self.config.bucket, deadline)?;

        let start = Instant::now();
        let response = self
            .uploader
            .put_file(&self.config.upload_url, &token, &key, &file.path, &file.mimetype)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.config.bucket,
                    key = %key,
                    "Cloud provider upload failed"
                );
                e
            })?;

        if !response.is_success() {
            tracing::error!(
                bucket = %self.config.bucket,
                key = %key,
                status = response.status,
                body = %response.body,
                "Cloud provider rejected upload"
            );
            return Err(StorageError::UploadFailed {
                message: format!("upload of '{}' rejected with status {}", key, response.status),
                status: Some(response.status),
                body: Some(response.body),
            });
        }

        tracing::info!(
            bucket = %self.config.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloud provider upload successful"
        );

        Ok(SavedFile {
            bucket: self.config.bucket.clone(),
            region: opts
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            prefix,
            mode: StorageMode::CloudProvider,
            mimetype: file.mimetype.clone(),
            filename: file.filename.clone(),
        })
    }

    async fn resolve(&self, request: &ResolveRequest) -> StorageResult<Resolved> {
        // TODO: redirect to `{domain}/{key}` once the provider key can be rebuilt from the descriptor
        tracing::warn!(
            bucket = %request.bucket,
            prefix = %request.prefix,
            key = %request.filename,
            "Cloud provider resolve is not implemented, reporting not found"
        );
        Ok(Resolved::NotFound)
    }

    fn mode(&self) -> StorageMode {
        StorageMode::CloudProvider
    }
}
