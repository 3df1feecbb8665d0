//! Storage for uploaded files.

use async_trait::async_trait;

/// A file received with a form submission.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `file` under the `upload_to` directory and return its relative
    /// name. A taken name gets a random suffix instead of being overwritten.
    async fn save(&self, upload_to: &str, file: &UploadedFile) -> Result<String, MediaError>;

    async fn exists(&self, name: &str) -> bool;

    /// Remove a stored file. Removing a missing file is not an error.
    async fn delete(&self, name: &str) -> Result<(), MediaError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Storage failed: {0}")]
    Io(String),
}
