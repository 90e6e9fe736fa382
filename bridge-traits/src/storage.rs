//! Storage and File System Abstractions
//!
//! Provides a platform-agnostic trait for the file I/O the cache and the
//! state file need, plus volume information for space accounting.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWrite;

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// State of the volume backing a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInfo {
    /// `false` when the medium is missing or unmounted
    pub mounted: bool,
    /// Bytes that can still be written
    pub available_bytes: u64,
}

impl VolumeInfo {
    pub fn unmounted() -> Self {
        Self {
            mounted: false,
            available_bytes: 0,
        }
    }
}

/// Writable stream into a file.
pub type WriteStream = Box<dyn AsyncWrite + Send + Unpin>;

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app directories, removable media
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn has_room(fs: &dyn FileSystemAccess, dir: &Path, need: u64) -> Result<bool> {
///     let volume = fs.volume_info(dir).await?;
///     Ok(volume.mounted && volume.available_bytes >= need)
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, replacing any previous contents
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Atomically move `from` over `to`
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Open a file for writing from the start, truncating it
    async fn open_write_stream(&self, path: &Path) -> Result<WriteStream>;

    /// Open a file for writing after its current end, creating it if needed
    async fn open_append_stream(&self, path: &Path) -> Result<WriteStream>;

    /// Report the volume that holds `path`
    async fn volume_info(&self, path: &Path) -> Result<VolumeInfo>;

    /// Length of a file, or `None` if it does not exist
    async fn file_len(&self, path: &Path) -> Result<Option<u64>> {
        if !self.exists(path).await? {
            return Ok(None);
        }
        Ok(Some(self.metadata(path).await?.size))
    }

    /// Calculate total size of a directory recursively
    async fn directory_size(&self, path: &Path) -> Result<u64> {
        let mut total = 0u64;
        let entries = self.list_directory(path).await?;

        for entry in entries {
            let metadata = self.metadata(&entry).await?;
            if metadata.is_directory {
                total += self.directory_size(&entry).await?;
            } else {
                total += metadata.size;
            }
        }

        Ok(total)
    }
}
