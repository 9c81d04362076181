use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tvault_protocol::MAX_OBJECT_SIZE;
use tvault_store::{FileObjectStore, InMemoryObjectStore, ObjectStore, StoreConfig};

use crate::error::{TrustedError, TrustedResult};

/// Where objects are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost when the app is dropped.
    Memory,
    /// One file per object under `root`.
    File { root: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustedConfig {
    /// Total bytes the store may hold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<u64>,
    /// Largest size a single object may reach. Never more than
    /// [`MAX_OBJECT_SIZE`], the most one read reply can carry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_object_size: Option<u64>,
    pub storage: StorageBackend,
}

impl Default for TrustedConfig {
    fn default() -> Self {
        Self {
            quota: None,
            max_object_size: None,
            storage: StorageBackend::Memory,
        }
    }
}

impl TrustedConfig {
    pub fn from_toml_str(s: &str) -> TrustedResult<Self> {
        toml::from_str(s).map_err(|e| TrustedError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> TrustedResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TrustedError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Use a file-backed store rooted at `root`.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage = StorageBackend::File { root: root.into() };
        self
    }

    /// Store limits. The object size limit is capped so every stored object
    /// can be read back.
    pub fn store_config(&self) -> StoreConfig {
        let max_object_size = self
            .max_object_size
            .map_or(MAX_OBJECT_SIZE, |max| max.min(MAX_OBJECT_SIZE));
        StoreConfig {
            quota: self.quota,
            max_object_size: Some(max_object_size),
        }
    }

    /// Open the configured backend.
    pub fn open_store(&self) -> TrustedResult<Arc<dyn ObjectStore>> {
        let config = self.store_config();
        Ok(match &self.storage {
            StorageBackend::Memory => Arc::new(InMemoryObjectStore::with_config(config)),
            StorageBackend::File { root } => Arc::new(FileObjectStore::open(root, config)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = TrustedConfig::default();
        assert_eq!(c.storage, StorageBackend::Memory);
        assert!(c.quota.is_none());
        assert!(c.max_object_size.is_none());
        assert_eq!(c.store_config().max_object_size, Some(MAX_OBJECT_SIZE));
    }

    #[test]
    fn object_size_limit_capped_to_reply_size() {
        let mut c = TrustedConfig::default();
        c.max_object_size = Some(u64::MAX);
        assert_eq!(c.store_config().max_object_size, Some(MAX_OBJECT_SIZE));
        c.max_object_size = Some(4096);
        assert_eq!(c.store_config().max_object_size, Some(4096));
    }

    #[test]
    fn parse_file_backend() {
        let c = TrustedConfig::from_toml_str(
            r#"
            quota = 1048576

            [storage]
            kind = "file"
            root = "/var/lib/tvault"
            "#,
        )
        .unwrap();
        assert_eq!(c.quota, Some(1_048_576));
        assert_eq!(c.storage, StorageBackend::File { root: "/var/lib/tvault".into() });
        assert_eq!(c.store_config().quota, Some(1_048_576));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(TrustedConfig::from_toml_str("").unwrap(), TrustedConfig::default());
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = TrustedConfig::from_toml_str("[storage]\nkind = \"tape\"\n").unwrap_err();
        assert!(matches!(err, TrustedError::Config(_)));
    }

    #[test]
    fn load_from_file_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tvault.toml");
        let c = TrustedConfig::default().with_storage_root(dir.path().join("objects"));
        std::fs::write(&path, toml::to_string(&c).unwrap()).unwrap();

        let loaded = TrustedConfig::load(&path).unwrap();
        assert_eq!(loaded, c);
        loaded.open_store().unwrap();
        assert!(dir.path().join("objects").is_dir());
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = TrustedConfig::load(Path::new("/nonexistent/tvault.toml")).unwrap_err();
        assert!(matches!(err, TrustedError::Config(_)));
    }
}
