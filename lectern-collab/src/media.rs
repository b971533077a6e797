use std::path::PathBuf;

use async_trait::async_trait;
use log::info;
use thiserror::Error;

use crate::util::random_string;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to store media: {0}")]
    Store(String),
}

/// Implementors can store an uploaded file and serve it at a public URL
#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    /// Uploads a file, returning the public URL it will be reachable at
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, MediaError>;
}

/// Stores media on the local disk, standing in for a real object store.
pub struct DiskMediaStore {
    directory: PathBuf,
    public_base: String,
}

impl DiskMediaStore {
    pub fn new(directory: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            public_base: public_base.into(),
        }
    }
}

#[async_trait]
impl MediaStore for DiskMediaStore {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, MediaError> {
        let safe_name = file_name.replace(['/', '\\'], "_");
        let unique_name = format!("{}-{}", random_string(12), safe_name);

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| MediaError::Store(e.to_string()))?;

        tokio::fs::write(self.directory.join(&unique_name), bytes)
            .await
            .map_err(|e| MediaError::Store(e.to_string()))?;

        info!("Stored media file {}", unique_name);

        Ok(format!(
            "{}/{}",
            self.public_base.trim_end_matches('/'),
            unique_name
        ))
    }
}
