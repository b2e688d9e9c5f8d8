use async_trait::async_trait;
use service_core::error::AppError;
use std::path::PathBuf;
use tokio::fs;

/// Proof file storage. Keys are relative paths; the local backend writes
/// them under the static-served uploads directory.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.base_path.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.base_path.join(key);
        let data = fs::read(path).await?;
        Ok(data)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.base_path.join(key);
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}
