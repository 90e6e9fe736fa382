//! # Playlist Queue
//!
//! Ordered track ids (duplicates allowed) plus a cursor. The cursor is `-1`
//! when nothing is selected and otherwise indexes into the queue.
//!
//! The queue itself knows nothing about playback; the controller decides
//! when a mutation also has to stop or start output. Out-of-range arguments
//! are rejected by returning `false`/`None` so callers can treat them as
//! silent no-ops.

use bridge_traits::TrackId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistQueue {
    tracks: Vec<TrackId>,
    position: i32,
}

impl PlaylistQueue {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            position: -1,
        }
    }

    /// Rebuild a queue from saved state. A position outside the queue
    /// becomes `-1`.
    pub fn from_parts(tracks: Vec<TrackId>, position: i32) -> Self {
        let mut queue = Self {
            tracks,
            position: -1,
        };
        if queue.in_bounds(position) {
            queue.position = position;
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn tracks(&self) -> &[TrackId] {
        &self.tracks
    }

    /// Track at the cursor.
    pub fn current(&self) -> Option<TrackId> {
        self.song_at(self.position)
    }

    pub fn song_at(&self, position: i32) -> Option<TrackId> {
        if self.in_bounds(position) {
            Some(self.tracks[position as usize])
        } else {
            None
        }
    }

    /// Last index holding `track_id`, or `-1`.
    pub fn position_of(&self, track_id: TrackId) -> i32 {
        self.tracks
            .iter()
            .rposition(|id| *id == track_id)
            .map(|index| index as i32)
            .unwrap_or(-1)
    }

    /// Index that follows the cursor, or `-1` at the end. With nothing
    /// selected the first entry is next.
    pub fn peek_next(&self) -> i32 {
        let next = self.position + 1;
        if self.in_bounds(next) {
            next
        } else {
            -1
        }
    }

    /// Move the cursor. Accepts `-1..len`.
    pub fn set_position(&mut self, position: i32) -> bool {
        if position == -1 || self.in_bounds(position) {
            self.position = position;
            true
        } else {
            false
        }
    }

    /// Insert at `position` (`0..=len`). The cursor shifts up when the
    /// insertion lands at or before it.
    pub fn insert(&mut self, track_id: TrackId, position: i32) -> bool {
        if position < 0 || position as usize > self.tracks.len() {
            return false;
        }

        self.tracks.insert(position as usize, track_id);
        if self.position >= 0 && position <= self.position {
            self.position += 1;
        }
        true
    }

    /// Remove the entry at `position` and return its id.
    ///
    /// The cursor is not moved down for removals before it; it is only
    /// clamped so it stays inside the shorter queue (`-1` once empty).
    pub fn remove(&mut self, position: i32) -> Option<TrackId> {
        if !self.in_bounds(position) {
            return None;
        }

        let removed = self.tracks.remove(position as usize);
        let last = self.tracks.len() as i32 - 1;
        if self.position > last {
            self.position = last;
        }
        Some(removed)
    }

    /// Move an entry, keeping the cursor on the same item.
    pub fn move_item(&mut self, from: i32, to: i32) -> bool {
        if !self.in_bounds(from) || !self.in_bounds(to) {
            return false;
        }
        if from == to {
            return true;
        }

        let track_id = self.tracks.remove(from as usize);
        self.tracks.insert(to as usize, track_id);

        if self.position == from {
            self.position = to;
        } else if from < self.position && to >= self.position {
            self.position -= 1;
        } else if from > self.position && to <= self.position {
            self.position += 1;
        }
        true
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.position = -1;
    }

    fn in_bounds(&self, position: i32) -> bool {
        position >= 0 && (position as usize) < self.tracks.len()
    }
}
