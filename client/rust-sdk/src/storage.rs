use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tokio::fs;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::User;

/// File name of the cached user snapshot.
pub const USER_SNAPSHOT_FILE: &str = "cozy_user.json";

/// Durable cache for the last-known user snapshot.
///
/// Strictly a startup fallback: once a live session check succeeds the cached
/// copy is rewritten and never consulted again. Callers treat failures here as
/// non-fatal and keep going.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    async fn load_user(&self) -> Result<Option<User>, StorageError>;
    async fn save_user(&self, user: &User) -> Result<(), StorageError>;
    async fn clear_user(&self) -> Result<(), StorageError>;
}

/// One JSON document per key under the cache directory. Concurrent processes
/// are not coordinated; last writer wins.
pub struct FileSnapshotStorage {
    dir: PathBuf,
}

impl FileSnapshotStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSnapshotStorage { dir: dir.into() }
    }

    fn user_path(&self) -> PathBuf {
        self.dir.join(USER_SNAPSHOT_FILE)
    }

    // Unique temp file plus rename, so readers never observe a half write.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStorage for FileSnapshotStorage {
    async fn load_user(&self) -> Result<Option<User>, StorageError> {
        let path = self.user_path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!("Discarding unreadable user snapshot: {}", e);
                Ok(None)
            }
        }
    }

    async fn save_user(&self, user: &User) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(user)?;
        self.write_atomic(&self.user_path(), &bytes).await
    }

    async fn clear_user(&self) -> Result<(), StorageError> {
        match fs::remove_file(self.user_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory snapshot store for tests and ephemeral embedders.
#[derive(Default)]
pub struct MemorySnapshotStorage {
    user: RwLock<Option<User>>,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn load_user(&self) -> Result<Option<User>, StorageError> {
        Ok(self
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save_user(&self, user: &User) -> Result<(), StorageError> {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());
        Ok(())
    }

    async fn clear_user(&self) -> Result<(), StorageError> {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
