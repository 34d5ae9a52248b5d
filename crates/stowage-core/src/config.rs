//! Configuration module
//!
//! Backend selection and per-backend settings, read from the environment. Keys can be
//! namespaced (`IMAGE_STORAGE`, `VIDEO_CLOUD_BUCKET`, ...) so one process can run a
//! differently configured engine per media kind.

use std::env;
use std::path::PathBuf;

use crate::constants::DEFAULT_BUCKET;
use crate::storage_types::StorageMode;

const DEFAULT_STORAGE_PATH: &str = "./uploads";
const DEFAULT_OBJECT_STORE_PORT: u16 = 9000;

/// Local disk engine settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalConfig {
    pub storage_path: PathBuf,
    pub default_bucket: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            default_bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

/// S3-compatible object store settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub port: u16,
    pub use_ssl: bool,
    pub access_key: String,
    pub secret_key: String,
}

impl ObjectStoreConfig {
    /// Endpoint URL handed to the S3 client, e.g. `http://minio:9000`.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let host = self
            .endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("{}://{}:{}", scheme, host, self.port)
    }
}

impl std::fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Token-authenticated cloud provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct CloudProviderConfig {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub prefix: String,
    pub domain: String,
    /// Form-upload endpoint of the provider.
    pub upload_url: String,
}

impl std::fmt::Debug for CloudProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudProviderConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("domain", &self.domain)
            .field("upload_url", &self.upload_url)
            .finish()
    }
}

/// Storage configuration: the selected mode plus the settings of every backend that
/// was configured. Only the selected backend's settings are required.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub mode: StorageMode,
    pub local: LocalConfig,
    pub object_store: Option<ObjectStoreConfig>,
    pub cloud_provider: Option<CloudProviderConfig>,
}

impl StorageConfig {
    /// Load from un-namespaced environment keys (`STORAGE`, `STORAGE_PATH`, ...).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(None, |key| env::var(key).ok())
    }

    /// Load from keys prefixed with `{namespace}_` (e.g. `IMAGE_STORAGE`).
    pub fn from_env_namespaced(namespace: &str) -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(Some(namespace), |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(namespace: Option<&str>, lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            let full_key = match namespace {
                Some(ns) if !ns.is_empty() => format!("{}_{}", ns.to_uppercase(), key),
                _ => key.to_string(),
            };
            lookup(&full_key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match get("STORAGE") {
            Some(value) => value.parse::<StorageMode>()?,
            None => StorageMode::Local,
        };

        let local = LocalConfig {
            storage_path: get("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH)),
            default_bucket: get("DEFAULT_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        };

        let object_store = match get("OBJECT_STORE_ENDPOINT") {
            Some(endpoint) => Some(ObjectStoreConfig {
                endpoint,
                port: match get("OBJECT_STORE_PORT") {
                    Some(port) => port
                        .parse()
                        .map_err(|_| anyhow::anyhow!("OBJECT_STORE_PORT must be a valid port number"))?,
                    None => DEFAULT_OBJECT_STORE_PORT,
                },
                use_ssl: match get("OBJECT_STORE_USE_SSL") {
                    Some(flag) => parse_bool(&flag)
                        .ok_or_else(|| anyhow::anyhow!("OBJECT_STORE_USE_SSL must be true or false"))?,
                    None => false,
                },
                access_key: get("OBJECT_STORE_ACCESS_KEY").unwrap_or_default(),
                secret_key: get("OBJECT_STORE_SECRET_KEY").unwrap_or_default(),
            }),
            None => None,
        };

        let cloud_provider = match get("CLOUD_ACCESS_KEY") {
            Some(access_key) => Some(CloudProviderConfig {
                access_key,
                secret_key: get("CLOUD_SECRET_KEY").unwrap_or_default(),
                bucket: get("CLOUD_BUCKET").unwrap_or_default(),
                prefix: get("CLOUD_PREFIX").unwrap_or_default(),
                domain: get("CLOUD_DOMAIN").unwrap_or_default(),
                upload_url: get("CLOUD_UPLOAD_URL").unwrap_or_default(),
            }),
            None => None,
        };

        let config = StorageConfig {
            mode,
            local,
            object_store,
            cloud_provider,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.local.storage_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("STORAGE_PATH must not be empty"));
        }

        let bucket = &self.local.default_bucket;
        if bucket.contains('/') || bucket.contains('\\') || bucket == "." || bucket == ".." {
            return Err(anyhow::anyhow!(
                "DEFAULT_BUCKET must be a plain directory name, got '{}'",
                bucket
            ));
        }

        match self.mode {
            StorageMode::Local => {}
            StorageMode::ObjectStore => {
                let config = self.object_store.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("STORAGE=object_store requires OBJECT_STORE_ENDPOINT to be set")
                })?;
                if config.port == 0 {
                    return Err(anyhow::anyhow!("OBJECT_STORE_PORT must not be 0"));
                }
                if config.access_key.is_empty() || config.secret_key.is_empty() {
                    return Err(anyhow::anyhow!(
                        "STORAGE=object_store requires OBJECT_STORE_ACCESS_KEY and OBJECT_STORE_SECRET_KEY"
                    ));
                }
            }
            StorageMode::CloudProvider => {
                let config = self.cloud_provider.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("STORAGE=cloud_provider requires CLOUD_ACCESS_KEY to be set")
                })?;
                if config.secret_key.is_empty() {
                    return Err(anyhow::anyhow!(
                        "STORAGE=cloud_provider requires CLOUD_SECRET_KEY"
                    ));
                }
                if config.bucket.is_empty() {
                    return Err(anyhow::anyhow!("STORAGE=cloud_provider requires CLOUD_BUCKET"));
                }
                if !(config.upload_url.starts_with("http://")
                    || config.upload_url.starts_with("https://"))
                {
                    return Err(anyhow::anyhow!(
                        "CLOUD_UPLOAD_URL must be an http(s) URL, got '{}'",
                        config.upload_url
                    ));
                }
            }
        }

        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_local() {
        let config = StorageConfig::from_lookup(None, lookup(&[])).unwrap();
        assert_eq!(config.mode, StorageMode::Local);
        assert_eq!(config.local, LocalConfig::default());
        assert!(config.object_store.is_none());
        assert!(config.cloud_provider.is_none());
    }

    #[test]
    fn object_store_settings() {
        let config = StorageConfig::from_lookup(
            None,
            lookup(&[
                ("STORAGE", "object_store"),
                ("OBJECT_STORE_ENDPOINT", "minio.internal"),
                ("OBJECT_STORE_USE_SSL", "true"),
                ("OBJECT_STORE_ACCESS_KEY", "ak"),
                ("OBJECT_STORE_SECRET_KEY", "sk"),
            ]),
        )
        .unwrap();

        let store = config.object_store.unwrap();
        assert_eq!(store.port, 9000);
        assert_eq!(store.endpoint_url(), "https://minio.internal:9000");
        assert!(!format!("{:?}", store).contains("sk\""));
    }

    #[test]
    fn object_store_requires_credentials() {
        let err = StorageConfig::from_lookup(
            None,
            lookup(&[("STORAGE", "object_store"), ("OBJECT_STORE_ENDPOINT", "minio")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("OBJECT_STORE_ACCESS_KEY"));

        let err = StorageConfig::from_lookup(None, lookup(&[("STORAGE", "object_store")]))
            .unwrap_err();
        assert!(err.to_string().contains("OBJECT_STORE_ENDPOINT"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = StorageConfig::from_lookup(
            None,
            lookup(&[("OBJECT_STORE_ENDPOINT", "minio"), ("OBJECT_STORE_PORT", "abc")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("OBJECT_STORE_PORT"));
    }

    #[test]
    fn namespaced_cloud_provider() {
        let config = StorageConfig::from_lookup(
            Some("image"),
            lookup(&[
                ("IMAGE_STORAGE", "cloud_provider"),
                ("IMAGE_CLOUD_ACCESS_KEY", "ak"),
                ("IMAGE_CLOUD_SECRET_KEY", "sk"),
                ("IMAGE_CLOUD_BUCKET", "media"),
                ("IMAGE_CLOUD_PREFIX", "img"),
                ("IMAGE_CLOUD_DOMAIN", "cdn.example.com"),
                ("IMAGE_CLOUD_UPLOAD_URL", "https://upload.example.com"),
                ("STORAGE", "local"),
            ]),
        )
        .unwrap();

        assert_eq!(config.mode, StorageMode::CloudProvider);
        let cloud = config.cloud_provider.unwrap();
        assert_eq!(cloud.bucket, "media");
        assert_eq!(cloud.prefix, "img");
    }

    #[test]
    fn cloud_provider_requires_upload_url() {
        let err = StorageConfig::from_lookup(
            None,
            lookup(&[
                ("STORAGE", "cloud_provider"),
                ("CLOUD_ACCESS_KEY", "ak"),
                ("CLOUD_SECRET_KEY", "sk"),
                ("CLOUD_BUCKET", "media"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("CLOUD_UPLOAD_URL"));
    }

    #[test]
    fn default_bucket_must_not_be_a_path() {
        let err = StorageConfig::from_lookup(None, lookup(&[("DEFAULT_BUCKET", "a/b")]))
            .unwrap_err();
        assert!(err.to_string().contains("DEFAULT_BUCKET"));
    }
}
