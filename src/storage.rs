use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::config::StorageConfig;
use crate::errors::ServiceError;

/// Key prefixes used by the application. URLs returned to clients are the
/// configured public base joined with the object key.
pub const DOCUMENTS_PREFIX: &str = "documents";
pub const VIDEO_PREFIX: &str = "video";
pub const THUMBNAIL_PREFIX: &str = "thumbnail";
pub const CATEGORIES_PREFIX: &str = "categories";
pub const AVATAR_PREFIX: &str = "avatar";

/// Blob store seam. The production deployment fronts an S3-compatible
/// store; the filesystem implementation below covers development and
/// tests with the same key discipline.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
    /// Public URL for a stored key.
    fn url(&self, key: &str) -> String;
}

pub struct FsObjectStorage {
    root: PathBuf,
    public_url: String,
}

impl FsObjectStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ServiceError> {
        // Keys are server-constructed, but reject traversal anyway.
        if key.split('/').any(|seg| seg == "..") || Path::new(key).is_absolute() {
            return Err(ServiceError::StorageError(format!("invalid key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    #[instrument(skip(self, bytes), fields(key = %key, size = bytes.len()))]
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ServiceError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::StorageError(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ServiceError::StorageError(e.to_string()))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::StorageError(e.to_string())),
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

/// Key for a logistics verification document.
pub fn document_key(user_id: uuid::Uuid, file_name: &str) -> String {
    format!("{DOCUMENTS_PREFIX}/{user_id}/{file_name}")
}

pub fn video_key(file_name: &str) -> String {
    format!("{VIDEO_PREFIX}/{file_name}")
}

pub fn thumbnail_key(file_name: &str) -> String {
    format!("{THUMBNAIL_PREFIX}/{file_name}")
}

pub fn category_image_key(file_name: &str) -> String {
    format!("{CATEGORIES_PREFIX}/{file_name}")
}

pub fn avatar_key(file_name: &str) -> String {
    format!("{AVATAR_PREFIX}/{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_store(root: &str) -> FsObjectStorage {
        FsObjectStorage::new(&StorageConfig {
            root_dir: root.to_string(),
            public_url: "https://cdn.example.com/bucket/".to_string(),
        })
    }

    #[test]
    fn url_joins_base_and_key() {
        let store = test_store("/tmp/mp-store");
        assert_eq!(
            store.url("documents/abc/id.pdf"),
            "https://cdn.example.com/bucket/documents/abc/id.pdf"
        );
    }

    #[test]
    fn document_keys_are_scoped_per_user() {
        let user = Uuid::nil();
        assert_eq!(
            document_key(user, "license.pdf"),
            format!("documents/{user}/license.pdf")
        );
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let store = test_store("/tmp/mp-store");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn put_then_delete_round_trips() {
        let dir = std::env::temp_dir().join(format!("mp-store-{}", Uuid::new_v4()));
        let store = test_store(dir.to_str().unwrap());
        store.put("video/clip.mp4", b"frames").await.unwrap();
        assert!(dir.join("video/clip.mp4").exists());
        store.delete("video/clip.mp4").await.unwrap();
        assert!(!dir.join("video/clip.mp4").exists());
        // deleting a missing key is a no-op
        store.delete("video/clip.mp4").await.unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }
}
