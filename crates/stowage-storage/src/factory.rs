#[cfg(feature = "storage-cloud-provider")]
use crate::CloudProviderEngine;
#[cfg(feature = "storage-object-store")]
use crate::ObjectStoreEngine;
use crate::{
    LocalDiskEngine, ResolveRequest, Resolved, StorageEngine, StorageError, StorageResult,
};
use async_trait::async_trait;
use stowage_core::{SaveOptions, SavedFile, StorageConfig, StorageMode, UploadedFile};

/// The configured storage backend, chosen once at startup.
pub enum Engine {
    Local(LocalDiskEngine),
    #[cfg(feature = "storage-object-store")]
    ObjectStore(ObjectStoreEngine),
    #[cfg(feature = "storage-cloud-provider")]
    CloudProvider(CloudProviderEngine),
}

impl Engine {
    fn inner(&self) -> &dyn StorageEngine {
        match self {
            Engine::Local(engine) => engine,
            #[cfg(feature = "storage-object-store")]
            Engine::ObjectStore(engine) => engine,
            #[cfg(feature = "storage-cloud-provider")]
            Engine::CloudProvider(engine) => engine,
        }
    }
}

#[async_trait]
impl StorageEngine for Engine {
    async fn save_entity(
        &self,
        file: &UploadedFile,
        opts: &SaveOptions,
    ) -> StorageResult<SavedFile> {
        self.inner().save_entity(file, opts).await
    }

    async fn resolve(&self, request: &ResolveRequest) -> StorageResult<Resolved> {
        self.inner().resolve(request).await
    }

    fn mode(&self) -> StorageMode {
        self.inner().mode()
    }
}

/// Create the storage engine selected by configuration
pub async fn create_engine(config: &StorageConfig) -> StorageResult<Engine> {
    match config.mode {
        StorageMode::Local => {
            let engine = LocalDiskEngine::new(&config.local).await?;
            Ok(Engine::Local(engine))
        }

        #[cfg(feature = "storage-object-store")]
        StorageMode::ObjectStore => {
            let settings = config.object_store.as_ref().ok_or_else(|| {
                StorageError::ConfigError("OBJECT_STORE_* settings not configured".to_string())
            })?;
            Ok(Engine::ObjectStore(ObjectStoreEngine::new(settings)))
        }

        #[cfg(not(feature = "storage-object-store"))]
        StorageMode::ObjectStore => Err(StorageError::ConfigError(
            "Object store backend not available (storage-object-store feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "storage-cloud-provider")]
        StorageMode::CloudProvider => {
            let settings = config.cloud_provider.as_ref().ok_or_else(|| {
                StorageError::ConfigError("CLOUD_* settings not configured".to_string())
            })?;
            Ok(Engine::CloudProvider(CloudProviderEngine::new(settings)?))
        }

        #[cfg(not(feature = "storage-cloud-provider"))]
        StorageMode::CloudProvider => Err(StorageError::ConfigError(
            "Cloud provider backend not available (storage-cloud-provider feature not enabled)"
                .to_string(),
        )),
    }
}
