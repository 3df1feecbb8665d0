use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use yatube_core::ports::{MediaError, MediaStorage, UploadedFile};

use super::{alternative_name, join_name, valid_name};

/// Keeps uploads in memory. Used by tests and the database-less dev mode.
#[derive(Default)]
pub struct InMemoryMediaStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(name).cloned()
    }
}

#[async_trait]
impl MediaStorage for InMemoryMediaStorage {
    async fn save(&self, upload_to: &str, file: &UploadedFile) -> Result<String, MediaError> {
        let base = valid_name(&file.file_name)?;
        let mut files = self.files.write().await;

        let mut name = join_name(upload_to, &base)?;
        while files.contains_key(&name) {
            name = join_name(upload_to, &alternative_name(&base))?;
        }
        files.insert(name.clone(), file.bytes.clone());
        Ok(name)
    }

    async fn exists(&self, name: &str) -> bool {
        self.files.read().await.contains_key(name)
    }

    async fn delete(&self, name: &str) -> Result<(), MediaError> {
        self.files.write().await.remove(name);
        Ok(())
    }
}
