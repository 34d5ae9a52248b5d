use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend that produced a [`crate::SavedFile`].
///
/// Defined in core because configuration selects an engine by mode and every
/// descriptor records the mode it was written with: serving logic differs per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    Local,
    ObjectStore,
    CloudProvider,
}

impl FromStr for StorageMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StorageMode::Local),
            "object_store" | "objectstore" | "s3" => Ok(StorageMode::ObjectStore),
            "cloud_provider" | "cloudprovider" | "cloud" => Ok(StorageMode::CloudProvider),
            _ => Err(anyhow::anyhow!("Invalid storage mode: {}", s)),
        }
    }
}

impl Display for StorageMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageMode::Local => write!(f, "local"),
            StorageMode::ObjectStore => write!(f, "object_store"),
            StorageMode::CloudProvider => write!(f, "cloud_provider"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("local".parse::<StorageMode>().unwrap(), StorageMode::Local);
        assert_eq!("S3".parse::<StorageMode>().unwrap(), StorageMode::ObjectStore);
        assert_eq!(
            "cloud_provider".parse::<StorageMode>().unwrap(),
            StorageMode::CloudProvider
        );
        assert!("nfs".parse::<StorageMode>().is_err());
    }

    #[test]
    fn display_matches_serde_name() {
        for mode in [
            StorageMode::Local,
            StorageMode::ObjectStore,
            StorageMode::CloudProvider,
        ] {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode));
            assert_eq!(mode.to_string().parse::<StorageMode>().unwrap(), mode);
        }
    }
}
