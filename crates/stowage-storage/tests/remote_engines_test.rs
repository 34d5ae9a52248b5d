#[path = "helpers/mod.rs"]
mod helpers;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use helpers::remote::{MemoryBucketClient, ScriptedUploader};
use helpers::{Delivery, RecordingSink, TestDisk};
use stowage_core::{CloudProviderConfig, SaveOptions, StorageMode};
use stowage_storage::{
    CloudProviderEngine, ObjectStoreEngine, ResolveRequest, StorageEngine, StorageError,
};

fn cloud_config() -> CloudProviderConfig {
    CloudProviderConfig {
        access_key: "ak".to_string(),
        secret_key: "sk".to_string(),
        bucket: "provider-bucket".to_string(),
        prefix: "uploads".to_string(),
        domain: "https://cdn.example.com".to_string(),
        upload_url: "https://upload.example.com".to_string(),
    }
}

#[tokio::test]
async fn test_object_store_creates_public_bucket_and_streams_file() {
    let disk = TestDisk::new().await;
    let engine = ObjectStoreEngine::with_client(MemoryBucketClient::default());
    let upload = disk.upload("logo.png", "image/png", b"png bytes");

    let saved = engine
        .save_entity(
            &upload,
            &SaveOptions::default()
                .bucket("assets")
                .prefix("2024/2")
                .region("us-east"),
        )
        .await
        .unwrap();

    assert_eq!(saved.bucket, "assets");
    assert_eq!(saved.region, "us-east");
    assert_eq!(saved.mode, StorageMode::ObjectStore);

    let client = engine.client();
    assert_eq!(
        client.buckets.lock().unwrap().clone(),
        vec![("assets".to_string(), "us-east".to_string())]
    );

    let policy: serde_json::Value =
        serde_json::from_str(&client.policy_for("assets").unwrap()).unwrap();
    assert_eq!(policy["Statement"][0]["Effect"], "Allow");
    assert_eq!(policy["Statement"][0]["Action"][0], "s3:GetObject");

    let objects = client.objects.lock().unwrap().clone();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].bucket, "assets");
    assert_eq!(objects[0].key, "2024/2/logo.png");
    assert_eq!(objects[0].content_type, "image/png");
    assert_eq!(objects[0].data, b"png bytes");
}

#[tokio::test]
async fn test_object_store_private_bucket_stays_private() {
    let disk = TestDisk::new().await;
    let engine = ObjectStoreEngine::with_client(MemoryBucketClient::default());
    let upload = disk.upload("secret.pdf", "application/pdf", b"pdf");

    engine
        .save_entity(&upload, &SaveOptions::default().bucket("private-contracts"))
        .await
        .unwrap();

    assert!(engine.client().policy_for("private-contracts").is_none());
    assert_eq!(engine.client().objects.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_object_store_reuses_existing_bucket() {
    let disk = TestDisk::new().await;
    let engine = ObjectStoreEngine::with_client(MemoryBucketClient::with_bucket("default"));
    let upload = disk.upload("a.txt", "text/plain", b"a");

    let saved = engine
        .save_entity(&upload, &SaveOptions::default())
        .await
        .unwrap();

    assert_eq!(saved.bucket, "default");
    assert_eq!(saved.region, "local");
    assert_eq!(engine.client().buckets.lock().unwrap().len(), 1);
    assert!(engine.client().policy_for("default").is_none());
}

#[tokio::test]
async fn test_object_store_resolve_reports_not_found() {
    let engine = ObjectStoreEngine::with_client(MemoryBucketClient::with_bucket("assets"));
    let mut sink = RecordingSink::default();

    engine
        .resolve_into(&ResolveRequest::new("assets", "2024/2", "logo.png"), &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.deliveries, vec![Delivery::NotFound]);
}

#[tokio::test]
async fn test_cloud_provider_upload_success() {
    let disk = TestDisk::new().await;
    let engine = CloudProviderEngine::with_uploader(
        &cloud_config(),
        ScriptedUploader::answering(200, r#"{"hash":"abc","key":"k"}"#),
    );
    let upload = disk.upload("cat.png", "image/png", b"png");

    let saved = engine
        .save_entity(&upload, &SaveOptions::default().bucket("media").prefix("2024/2"))
        .await
        .unwrap();

    assert_eq!(saved.bucket, "provider-bucket");
    assert_eq!(saved.prefix, "2024/2");
    assert_eq!(saved.mode, StorageMode::CloudProvider);

    let uploads = engine.uploader().uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].upload_url, "https://upload.example.com");
    assert_eq!(uploads[0].key, "media/2024/2/cat.png");
    assert_eq!(uploads[0].mimetype, "image/png");

    let parts: Vec<&str> = uploads[0].token.split(':').collect();
    assert_eq!(parts[0], "ak");
    let policy: serde_json::Value =
        serde_json::from_slice(&URL_SAFE.decode(parts[2]).unwrap()).unwrap();
    assert_eq!(policy["scope"], "provider-bucket");
    assert!(policy["deadline"].as_i64().unwrap() > chrono::Utc::now().timestamp());
}

#[tokio::test]
async fn test_cloud_provider_defaults_logical_bucket_to_configured_prefix() {
    let disk = TestDisk::new().await;
    let engine =
        CloudProviderEngine::with_uploader(&cloud_config(), ScriptedUploader::answering(200, "{}"));
    let upload = disk.upload("a.txt", "text/plain", b"a");

    engine
        .save_entity(&upload, &SaveOptions::default().prefix("2024/2"))
        .await
        .unwrap();

    let uploads = engine.uploader().uploads.lock().unwrap().clone();
    assert_eq!(uploads[0].key, "uploads/2024/2/a.txt");
}

#[tokio::test]
async fn test_cloud_provider_rejection_carries_payload() {
    let disk = TestDisk::new().await;
    let engine = CloudProviderEngine::with_uploader(
        &cloud_config(),
        ScriptedUploader::answering(401, r#"{"error":"bad token"}"#),
    );
    let upload = disk.upload("cat.png", "image/png", b"png");

    let err = engine
        .save_entity(&upload, &SaveOptions::default().bucket("media"))
        .await
        .unwrap_err();

    match err {
        StorageError::UploadFailed { status, body, .. } => {
            assert_eq!(status, Some(401));
            assert_eq!(body.as_deref(), Some(r#"{"error":"bad token"}"#));
        }
        other => panic!("expected upload failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cloud_provider_transport_error_is_upload_failure() {
    let disk = TestDisk::new().await;
    let engine = CloudProviderEngine::with_uploader(&cloud_config(), ScriptedUploader::unreachable());
    let upload = disk.upload("cat.png", "image/png", b"png");

    let err = engine
        .save_entity(&upload, &SaveOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::UploadFailed { status: None, .. }
    ));
}

#[tokio::test]
async fn test_cloud_provider_requires_file() {
    let disk = TestDisk::new().await;
    let engine =
        CloudProviderEngine::with_uploader(&cloud_config(), ScriptedUploader::answering(200, "{}"));
    let missing = stowage_core::UploadedFile::new(disk.root().join("none"), "none.png", "image/png");

    let err = engine
        .save_entity(&missing, &SaveOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::FileRequired(_)));
    assert!(engine.uploader().uploads.lock().unwrap().is_empty());
}
