use crate::core::{ObjectMeta, Storage};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory object store shared by the stage tests.
#[derive(Clone, Default)]
pub struct MockStorage {
    pub files: Arc<Mutex<HashMap<String, (Vec<u8>, ObjectMeta)>>>,
}

impl MockStorage {
    pub async fn put(&self, key: &str, body: &[u8]) {
        self.files
            .lock()
            .await
            .insert(key.to_string(), (body.to_vec(), ObjectMeta::csv()));
    }

    pub async fn get(&self, key: &str) -> Option<(String, ObjectMeta)> {
        let files = self.files.lock().await;
        files
            .get(key)
            .map(|(data, meta)| (String::from_utf8(data.clone()).unwrap(), meta.clone()))
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, key: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| EtlError::SourceNotFound {
                location: key.to_string(),
            })
    }

    async fn write_file(&self, key: &str, data: &[u8], meta: &ObjectMeta) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(key.to_string(), (data.to_vec(), meta.clone()));
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("mock://{}", key)
    }
}
