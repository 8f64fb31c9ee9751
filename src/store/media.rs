// src/store/media.rs

//! Binary assets (question images, lesson PDFs) kept outside the databases.

use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;

use super::{StoreError, StoreResult};

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Writes `bytes` under `name`, replacing any previous file.
    async fn put(&self, name: &str, bytes: &[u8]) -> StoreResult<()>;

    /// Removes `name`. Returns false when nothing was stored under it.
    async fn delete(&self, name: &str) -> StoreResult<bool>;
}

/// Files in one flat directory. Names are generated server side and never
/// contain path separators.
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn io_error(e: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("media directory: {}", e))
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error)?;
        tokio::fs::write(self.root.join(name), bytes)
            .await
            .map_err(io_error)
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(e)),
        }
    }
}
