//! Uploads written under a media root on the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use yatube_core::ports::{MediaError, MediaStorage, UploadedFile};

use super::{alternative_name, join_name, valid_name};

pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn io_err(err: std::io::Error) -> MediaError {
    MediaError::Io(err.to_string())
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, upload_to: &str, file: &UploadedFile) -> Result<String, MediaError> {
        let base = valid_name(&file.file_name)?;
        let mut name = join_name(upload_to, &base)?;

        if let Some(parent) = self.root.join(&name).parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // create_new fails on a taken name, so a concurrent upload cannot be
        // overwritten between the check and the write.
        loop {
            let path = self.root.join(&name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut handle) => {
                    use tokio::io::AsyncWriteExt;
                    handle.write_all(&file.bytes).await.map_err(io_err)?;
                    handle.flush().await.map_err(io_err)?;
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    name = join_name(upload_to, &alternative_name(&base))?;
                }
                Err(e) => return Err(io_err(e)),
            }
        }

        tracing::debug!(name = %name, size = file.bytes.len(), "Stored upload");
        Ok(name)
    }

    async fn exists(&self, name: &str) -> bool {
        if name.split('/').any(|part| part == "..") {
            return false;
        }
        tokio::fs::try_exists(self.root.join(name))
            .await
            .unwrap_or(false)
    }

    async fn delete(&self, name: &str) -> Result<(), MediaError> {
        if name.split('/').any(|part| part == "..") {
            return Err(MediaError::InvalidName(name.to_string()));
        }
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                tracing::debug!(name = %name, "Removed upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(e)),
        }
    }
}
