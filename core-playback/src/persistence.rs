//! # State Persistence
//!
//! Versioned binary snapshot of the queue and coarse play flags, written
//! through a temp file and renamed over the live file.
//!
//! ## Layout (big-endian)
//!
//! ```text
//! i32  format_version
//! i32  position
//! u8   playing
//! u8   paused
//! i32  paused_offset_ms
//! i32  count
//! i64  track_id × count
//! ```
//!
//! A file with a different format version is deleted and treated as absent;
//! there is no migration.

use crate::error::{PlaybackError, Result};
use bridge_traits::{FileSystemAccess, TrackId};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Current on-disk format version.
pub const STATE_FORMAT_VERSION: i32 = 1;

const HEADER_LEN: usize = 4 + 4 + 1 + 1 + 4 + 4;

/// What survives a process restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub tracks: Vec<TrackId>,
    pub position: i32,
    pub playing: bool,
    pub paused: bool,
    /// Only meaningful when `paused` is set.
    pub paused_offset_ms: i32,
}

impl PlaybackSnapshot {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.tracks.len() * 8);
        buf.put_i32(STATE_FORMAT_VERSION);
        buf.put_i32(self.position);
        buf.put_u8(self.playing as u8);
        buf.put_u8(self.paused as u8);
        buf.put_i32(if self.paused { self.paused_offset_ms } else { 0 });
        buf.put_i32(self.tracks.len() as i32);
        for track_id in &self.tracks {
            buf.put_i64(*track_id);
        }
        buf.freeze()
    }

    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(PlaybackError::CorruptState("missing header".to_string()));
        }

        let version = data.get_i32();
        if version != STATE_FORMAT_VERSION {
            return Err(PlaybackError::CorruptState(format!(
                "unsupported format version {}",
                version
            )));
        }

        if data.remaining() < HEADER_LEN - 4 {
            return Err(PlaybackError::CorruptState("truncated header".to_string()));
        }

        let position = data.get_i32();
        let playing = data.get_u8() != 0;
        let paused = data.get_u8() != 0;
        let paused_offset_ms = data.get_i32();
        let count = data.get_i32();

        if count < 0 || data.remaining() != count as usize * 8 {
            return Err(PlaybackError::CorruptState(format!(
                "expected {} track ids, found {} bytes",
                count,
                data.remaining()
            )));
        }

        let tracks = (0..count).map(|_| data.get_i64()).collect();

        Ok(Self {
            tracks,
            position,
            playing,
            paused,
            paused_offset_ms,
        })
    }
}

/// Reads and writes the state file.
pub struct StatePersistence {
    fs: Arc<dyn FileSystemAccess>,
    path: PathBuf,
}

impl StatePersistence {
    pub fn new(fs: Arc<dyn FileSystemAccess>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Write the snapshot to a temp file, then rename it over the live file.
    #[instrument(skip(self, snapshot), fields(tracks = snapshot.tracks.len()))]
    pub async fn save(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                self.fs.create_dir_all(parent).await?;
            }
        }

        let temp = self.temp_path();
        self.fs.write_file(&temp, snapshot.encode()).await?;
        self.fs.rename(&temp, &self.path).await?;

        debug!(position = snapshot.position, "Saved playback state");
        Ok(())
    }

    /// Load the saved snapshot. An absent file yields `None`; an unreadable
    /// or mismatched one is deleted and also yields `None`.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> Result<Option<PlaybackSnapshot>> {
        if !self.fs.exists(&self.path).await? {
            debug!("No saved playback state");
            return Ok(None);
        }

        let data = self.fs.read_file(&self.path).await?;
        match PlaybackSnapshot::decode(&data) {
            Ok(snapshot) => {
                info!(
                    tracks = snapshot.tracks.len(),
                    position = snapshot.position,
                    playing = snapshot.playing,
                    paused = snapshot.paused,
                    "Recovered playback state"
                );
                Ok(Some(snapshot))
            }
            Err(e) => {
                warn!(error = %e, "Discarding saved playback state");
                if let Err(e) = self.fs.delete_file(&self.path).await {
                    warn!(error = %e, "Failed to delete stale state file");
                }
                Ok(None)
            }
        }
    }
}
