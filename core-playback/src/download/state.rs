//! Per-transfer state machine and records.

use bridge_traits::TrackId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle of one transfer.
///
/// ```text
/// Connecting ─> Downloading ─> Finished
///      │             │
///      └─────────────┴──────> Aborted | HttpError | FileError
///                             | PausedLocalFailure | PausedRemoteFailure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadState {
    Connecting,
    Downloading,
    Finished,
    /// Superseded or stopped by a caller.
    Aborted,
    /// Server returned 4xx/5xx. Not retried.
    HttpError,
    /// Local write or commit failed. Not retried.
    FileError,
    /// Storage went away mid-transfer; resumable.
    PausedLocalFailure,
    /// Connection lost mid-transfer; resumable.
    PausedRemoteFailure,
}

impl DownloadState {
    /// Returns true while the worker is still running.
    pub fn is_active(&self) -> bool {
        matches!(self, DownloadState::Connecting | DownloadState::Downloading)
    }

    /// Returns true for states that [`resume_downloads`] restarts.
    ///
    /// [`resume_downloads`]: super::DownloadManager::resume_downloads
    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            DownloadState::PausedLocalFailure | DownloadState::PausedRemoteFailure
        )
    }

    /// Returns true for failures that are never retried.
    pub fn is_permanent_failure(&self) -> bool {
        matches!(self, DownloadState::HttpError | DownloadState::FileError)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// Record of a tracked transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub track_id: TrackId,
    pub url: String,
    pub destination: PathBuf,
    pub expected_length: u64,
    pub bytes_written: u64,
    pub resume_offset: u64,
    pub state: DownloadState,
    pub last_error: Option<String>,
}

impl Download {
    /// Download progress percentage (0-100).
    pub fn progress_percent(&self) -> u8 {
        if self.expected_length == 0 {
            return 0;
        }
        ((self.bytes_written.min(self.expected_length) * 100) / self.expected_length) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_classification() {
        assert!(DownloadState::Connecting.is_active());
        assert!(DownloadState::Downloading.is_active());
        assert!(DownloadState::Finished.is_terminal());
        assert!(DownloadState::PausedRemoteFailure.is_paused());
        assert!(DownloadState::PausedLocalFailure.is_paused());
        assert!(!DownloadState::Aborted.is_paused());
        assert!(DownloadState::HttpError.is_permanent_failure());
        assert!(DownloadState::FileError.is_permanent_failure());
        assert!(!DownloadState::PausedRemoteFailure.is_permanent_failure());
    }

    #[test]
    fn test_progress_percent() {
        let mut download = Download {
            track_id: 1,
            url: "http://host/a".into(),
            destination: PathBuf::from("/cache/1/a.mp3"),
            expected_length: 200,
            bytes_written: 50,
            resume_offset: 0,
            state: DownloadState::Downloading,
            last_error: None,
        };
        assert_eq!(download.progress_percent(), 25);

        download.bytes_written = 400;
        assert_eq!(download.progress_percent(), 100);

        download.expected_length = 0;
        assert_eq!(download.progress_percent(), 0);
    }
}
