use crate::core::{ObjectMeta, Storage};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Filesystem stand-in for the object store. Keys map to paths under
/// `base_path`; object metadata goes to a `<key>.metadata.json` sidecar.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    metadata: BTreeMap<String, String>,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.full_path(&format!("{}.metadata.json", key))
    }

    pub async fn read_metadata(&self, key: &str) -> Result<ObjectMeta> {
        let data = self.read_path(&self.sidecar_path(key)).await?;
        let sidecar: Sidecar = serde_json::from_slice(&data)?;
        Ok(ObjectMeta {
            content_type: sidecar.content_type,
            metadata: sidecar.metadata,
        })
    }

    async fn read_path(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EtlError::SourceNotFound {
                location: path.display().to_string(),
            },
            _ => EtlError::IoError(e),
        })
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, key: &str) -> Result<Vec<u8>> {
        self.read_path(&self.full_path(key)).await
    }

    async fn write_file(&self, key: &str, data: &[u8], meta: &ObjectMeta) -> Result<()> {
        let full_path = self.full_path(key);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, data).await?;

        let sidecar = Sidecar {
            content_type: meta.content_type.clone(),
            metadata: meta.metadata.clone(),
        };
        tokio::fs::write(self.sidecar_path(key), serde_json::to_vec_pretty(&sidecar)?).await?;

        tracing::debug!("Wrote {} bytes to {}", data.len(), full_path.display());
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        self.full_path(key).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_with_metadata() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let key = "raw/orders/2024/03/05/orders_20240305_102030.123456Z.csv";
        let meta = ObjectMeta::csv().with("ingested_at", "2024-03-05T10:20:30.123456Z");

        storage.write_file(key, b"order_id\n1\n", &meta).await.unwrap();

        assert_eq!(storage.read_file(key).await.unwrap(), b"order_id\n1\n");
        assert_eq!(storage.read_metadata(key).await.unwrap(), meta);
        assert!(dir.path().join(key).exists());
    }

    #[tokio::test]
    async fn test_missing_key_is_source_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let result = storage.read_file("clean/orders/nothing.csv").await;
        assert!(matches!(result, Err(EtlError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_rewrite_same_key_overwrites() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let key = "clean/customers/2024/01/01/customers_clean_x.csv";

        storage.write_file(key, b"a\n1\n", &ObjectMeta::csv()).await.unwrap();
        storage.write_file(key, b"a\n2\n", &ObjectMeta::csv()).await.unwrap();

        assert_eq!(storage.read_file(key).await.unwrap(), b"a\n2\n");
    }
}
