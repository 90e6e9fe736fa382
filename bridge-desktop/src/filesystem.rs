//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess, VolumeInfo, WriteStream},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Default quota for the desktop cache volume (1 GiB).
pub const DEFAULT_QUOTA_BYTES: u64 = 1024 * 1024 * 1024;

/// Tokio-based file system implementation
///
/// Desktop machines have no removable "volume" to speak of, so free space
/// is reported against a quota on the root directory: available bytes are
/// the quota minus what the root already holds. The volume reads as
/// unmounted when the root cannot be created or is not a directory.
pub struct TokioFileSystem {
    root: PathBuf,
    quota_bytes: u64,
}

impl TokioFileSystem {
    /// File system rooted in the platform cache directory
    pub fn new() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("cacheplay");

        Self::with_quota(root, DEFAULT_QUOTA_BYTES)
    }

    /// File system whose free space is `quota_bytes` minus the size of `root`
    pub fn with_quota(root: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            root: root.into(),
            quota_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(Self::map_io_error)?;
            }
        }
        Ok(())
    }

    /// Whether the root exists as a directory, creating it if missing.
    async fn root_available(&self) -> bool {
        match fs::metadata(&self.root).await {
            Ok(metadata) => metadata.is_dir(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match fs::create_dir_all(&self.root).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(root = ?self.root, error = %e, "Cannot create cache root");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(root = ?self.root, error = %e, "Cannot access cache root");
                false
            }
        }
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        self.ensure_parent(path).await?;

        fs::write(path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).await.map_err(Self::map_io_error)?;
        debug!(from = ?from, to = ?to, "Renamed file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(Self::map_io_error)?
        {
            entries.push(entry.path());
        }

        Ok(entries)
    }

    async fn open_write_stream(&self, path: &Path) -> Result<WriteStream> {
        self.ensure_parent(path).await?;

        let file = fs::File::create(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Opened file for writing");
        Ok(Box::new(file))
    }

    async fn open_append_stream(&self, path: &Path) -> Result<WriteStream> {
        self.ensure_parent(path).await?;

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Opened file for appending");
        Ok(Box::new(file))
    }

    async fn volume_info(&self, _path: &Path) -> Result<VolumeInfo> {
        if !self.root_available().await {
            return Ok(VolumeInfo::unmounted());
        }

        let used = self.directory_size(&self.root).await?;
        let available = self.quota_bytes.saturating_sub(used);

        debug!(root = ?self.root, used, available, "Volume info");
        Ok(VolumeInfo {
            mounted: true,
            available_bytes: available,
        })
    }
}
