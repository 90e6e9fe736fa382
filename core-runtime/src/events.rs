//! # Listener Hub
//!
//! Multi-channel broadcast registry for remote observers of the player.
//!
//! ## Overview
//!
//! Observers register on one or more of four independent channels:
//! - **Move**: jump/play/pause/unpause/stop/seek transitions
//! - **Change**: insert/remove/move/clear mutations of the queue
//! - **Buffer**: buffering percent of the *currently playing* track
//! - **Download**: begin/progress/error/finish/cancel, keyed by track id,
//!   for every tracked transfer
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   emit_move    ┌─────────────┐   try_send   ┌────────────┐
//! │ Controller  ├───────────────>│             ├─────────────>│ Subscriber │
//! │   actor     │   emit_change  │ ListenerHub │              └────────────┘
//! │             ├───────────────>│  (per-chan  │   try_send   ┌────────────┐
//! │             │   emit_buffer  │  sender     ├─────────────>│ Subscriber │
//! │             ├───────────────>│  lists +    │              └────────────┘
//! │             │ emit_download  │  replay     │   try_send   ┌────────────┐
//! │             ├───────────────>│  state)     ├─────────────>│ Subscriber │
//! └─────────────┘                └─────────────┘              └────────────┘
//! ```
//!
//! ## Delivery
//!
//! Each subscriber owns a bounded `tokio::sync::mpsc` receiver. Broadcasting
//! iterates the channel's senders and calls `try_send`; a subscriber whose
//! receiver is closed or full is dropped from that channel without affecting
//! anyone else. Events on one channel reach every subscriber in emission
//! order. There is no ordering between channels.
//!
//! ## Stateful registration
//!
//! The hub remembers the last buffering percent and the progress of every
//! tracked transfer. A new Buffer subscriber immediately receives the current
//! percent (if a track is playing) and a new Download subscriber receives a
//! `Begin` plus a `Progress` for each tracked transfer, before any live event.
//! A transfer paused on a retryable failure is replayed with its `Error` as
//! well, so late subscribers do not mistake it for a running one.
//!
//! ```rust
//! use core_runtime::events::{DownloadEvent, ListenerHub};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let hub = ListenerHub::new(16);
//! hub.emit_download(DownloadEvent::Begin { track_id: 7, total_bytes: 100 });
//! hub.emit_download(DownloadEvent::Progress { track_id: 7, downloaded_bytes: 40, total_bytes: 100 });
//!
//! let mut late = hub.subscribe_download();
//! assert!(matches!(late.try_recv(), Some(DownloadEvent::Begin { track_id: 7, .. })));
//! assert!(matches!(late.try_recv(), Some(DownloadEvent::Progress { downloaded_bytes: 40, .. })));
//! # }
//! ```

use bridge_traits::TrackId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Default per-subscriber queue depth.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

// ============================================================================
// Event Types
// ============================================================================

/// Player transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum MoveEvent {
    /// The cursor moved to a new queue position.
    Jump { position: i32, track_id: TrackId },
    /// Playback of the current position started.
    Play { position: i32, track_id: TrackId },
    /// Output paused.
    Pause { position_ms: i64 },
    /// Output resumed after a pause.
    Unpause,
    /// Playback stopped.
    Stop,
    /// Current track repositioned.
    Seek { position_ms: u64 },
}

impl MoveEvent {
    pub fn description(&self) -> &str {
        match self {
            MoveEvent::Jump { .. } => "Jumped to position",
            MoveEvent::Play { .. } => "Playback started",
            MoveEvent::Pause { .. } => "Playback paused",
            MoveEvent::Unpause => "Playback resumed",
            MoveEvent::Stop => "Playback stopped",
            MoveEvent::Seek { .. } => "Seeked",
        }
    }
}

/// Queue mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ChangeEvent {
    /// A track was inserted at `position`.
    Insert { position: i32, track_id: TrackId },
    /// The entry at `position` was removed.
    ///
    /// `current_position` is the cursor after the removal.
    Remove {
        position: i32,
        track_id: TrackId,
        current_position: i32,
    },
    /// An entry moved from `from` to `to`.
    Move { from: i32, to: i32 },
    /// The queue was emptied.
    Clear,
}

/// Buffering state of the playing track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BufferEvent {
    pub track_id: TrackId,
    pub percent: u8,
}

/// Transfer lifecycle, keyed by track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    Begin {
        track_id: TrackId,
        total_bytes: u64,
    },
    Progress {
        track_id: TrackId,
        downloaded_bytes: u64,
        total_bytes: u64,
    },
    /// The transfer failed. `retryable` transfers stay tracked until resumed.
    Error {
        track_id: TrackId,
        message: String,
        retryable: bool,
    },
    Finish {
        track_id: TrackId,
    },
    Cancel {
        track_id: TrackId,
    },
}

impl DownloadEvent {
    pub fn track_id(&self) -> TrackId {
        match self {
            DownloadEvent::Begin { track_id, .. }
            | DownloadEvent::Progress { track_id, .. }
            | DownloadEvent::Error { track_id, .. }
            | DownloadEvent::Finish { track_id }
            | DownloadEvent::Cancel { track_id } => *track_id,
        }
    }
}

/// Selector for the four channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListenerChannel {
    Move,
    Change,
    Buffer,
    Download,
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Handle identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiving side of a hub registration created by the `subscribe_*` helpers.
#[derive(Debug)]
pub struct Subscription<E> {
    id: SubscriberId,
    receiver: mpsc::Receiver<E>,
}

impl<E> Subscription<E> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event. `None` once the hub dropped this subscriber.
    pub async fn recv(&mut self) -> Option<E> {
        self.receiver.recv().await
    }

    /// Take an already delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<E> {
        self.receiver.try_recv().ok()
    }
}

struct Channel<E> {
    name: &'static str,
    subscribers: Vec<(SubscriberId, mpsc::Sender<E>)>,
}

impl<E: Clone> Channel<E> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            subscribers: Vec::new(),
        }
    }

    fn add(&mut self, id: SubscriberId, sender: mpsc::Sender<E>) {
        self.subscribers.push((id, sender));
    }

    fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        before != self.subscribers.len()
    }

    fn broadcast(&mut self, event: &E) -> usize {
        let name = self.name;
        self.subscribers
            .retain(|(id, sender)| match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(err) => {
                    debug!(channel = name, subscriber = %id, error = %err, "Dropping listener");
                    false
                }
            });
        self.subscribers.len()
    }
}

#[derive(Debug, Clone)]
struct TransferProgress {
    total_bytes: u64,
    downloaded_bytes: u64,
    /// Last retryable error while the transfer waits to be resumed.
    paused: Option<String>,
}

struct HubState {
    moves: Channel<MoveEvent>,
    changes: Channel<ChangeEvent>,
    buffers: Channel<BufferEvent>,
    downloads: Channel<DownloadEvent>,
    buffer: Option<BufferEvent>,
    transfers: BTreeMap<TrackId, TransferProgress>,
}

impl HubState {
    fn replay_transfers(&self) -> Vec<DownloadEvent> {
        self.transfers
            .iter()
            .flat_map(|(track_id, progress)| {
                let paused = progress.paused.clone().map(|message| DownloadEvent::Error {
                    track_id: *track_id,
                    message,
                    retryable: true,
                });
                [
                    DownloadEvent::Begin {
                        track_id: *track_id,
                        total_bytes: progress.total_bytes,
                    },
                    DownloadEvent::Progress {
                        track_id: *track_id,
                        downloaded_bytes: progress.downloaded_bytes,
                        total_bytes: progress.total_bytes,
                    },
                ]
                .into_iter()
                .chain(paused)
            })
            .collect()
    }

    fn track_transfer(&mut self, event: &DownloadEvent) {
        match event {
            DownloadEvent::Begin {
                track_id,
                total_bytes,
            } => {
                // A resumed transfer keeps the bytes it already has.
                let downloaded_bytes = self
                    .transfers
                    .get(track_id)
                    .map_or(0, |previous| previous.downloaded_bytes);
                self.transfers.insert(
                    *track_id,
                    TransferProgress {
                        total_bytes: *total_bytes,
                        downloaded_bytes,
                        paused: None,
                    },
                );
            }
            DownloadEvent::Progress {
                track_id,
                downloaded_bytes,
                total_bytes,
            } => {
                self.transfers.insert(
                    *track_id,
                    TransferProgress {
                        total_bytes: *total_bytes,
                        downloaded_bytes: *downloaded_bytes,
                        paused: None,
                    },
                );
            }
            DownloadEvent::Error {
                track_id,
                message,
                retryable: true,
            } => {
                if let Some(progress) = self.transfers.get_mut(track_id) {
                    progress.paused = Some(message.clone());
                }
            }
            DownloadEvent::Error { track_id, .. }
            | DownloadEvent::Finish { track_id }
            | DownloadEvent::Cancel { track_id } => {
                self.transfers.remove(track_id);
            }
        }
    }
}

// ============================================================================
// Listener Hub
// ============================================================================

/// Registry of observers for the four player channels.
///
/// The hub is `Send + Sync` and shared behind an `Arc`. All emission happens
/// under one short lock so registration replay and live events never
/// interleave.
pub struct ListenerHub {
    state: Mutex<HubState>,
    next_id: AtomicU64,
    capacity: usize,
}

impl ListenerHub {
    /// Creates a hub whose `subscribe_*` helpers use `capacity`-deep queues.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState {
                moves: Channel::new("move"),
                changes: Channel::new("change"),
                buffers: Channel::new("buffer"),
                downloads: Channel::new("download"),
                buffer: None,
                transfers: BTreeMap::new(),
            }),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    fn allocate_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // ---- registration -----------------------------------------------------

    pub fn register_move(&self, sender: mpsc::Sender<MoveEvent>) -> SubscriberId {
        let id = self.allocate_id();
        self.state.lock().moves.add(id, sender);
        id
    }

    pub fn register_change(&self, sender: mpsc::Sender<ChangeEvent>) -> SubscriberId {
        let id = self.allocate_id();
        self.state.lock().changes.add(id, sender);
        id
    }

    /// Registers a Buffer listener, replaying the current percent first.
    pub fn register_buffer(&self, sender: mpsc::Sender<BufferEvent>) -> SubscriberId {
        let id = self.allocate_id();
        let mut state = self.state.lock();
        if let Some(current) = state.buffer {
            if sender.try_send(current).is_err() {
                return id;
            }
        }
        state.buffers.add(id, sender);
        id
    }

    /// Registers a Download listener, replaying begin and progress for every
    /// tracked transfer first.
    pub fn register_download(&self, sender: mpsc::Sender<DownloadEvent>) -> SubscriberId {
        let id = self.allocate_id();
        let mut state = self.state.lock();
        for event in state.replay_transfers() {
            if sender.try_send(event).is_err() {
                return id;
            }
        }
        state.downloads.add(id, sender);
        id
    }

    pub fn subscribe_move(&self) -> Subscription<MoveEvent> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = self.register_move(sender);
        Subscription { id, receiver }
    }

    pub fn subscribe_change(&self) -> Subscription<ChangeEvent> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = self.register_change(sender);
        Subscription { id, receiver }
    }

    pub fn subscribe_buffer(&self) -> Subscription<BufferEvent> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = self.register_buffer(sender);
        Subscription { id, receiver }
    }

    pub fn subscribe_download(&self) -> Subscription<DownloadEvent> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = self.register_download(sender);
        Subscription { id, receiver }
    }

    /// Removes a registration. Returns `false` if it was not present.
    pub fn unregister(&self, channel: ListenerChannel, id: SubscriberId) -> bool {
        let mut state = self.state.lock();
        match channel {
            ListenerChannel::Move => state.moves.remove(id),
            ListenerChannel::Change => state.changes.remove(id),
            ListenerChannel::Buffer => state.buffers.remove(id),
            ListenerChannel::Download => state.downloads.remove(id),
        }
    }

    pub fn subscriber_count(&self, channel: ListenerChannel) -> usize {
        let state = self.state.lock();
        match channel {
            ListenerChannel::Move => state.moves.subscribers.len(),
            ListenerChannel::Change => state.changes.subscribers.len(),
            ListenerChannel::Buffer => state.buffers.subscribers.len(),
            ListenerChannel::Download => state.downloads.subscribers.len(),
        }
    }

    // ---- emission ---------------------------------------------------------

    /// Broadcasts a Move event. Returns the number of remaining subscribers.
    pub fn emit_move(&self, event: MoveEvent) -> usize {
        self.state.lock().moves.broadcast(&event)
    }

    pub fn emit_change(&self, event: ChangeEvent) -> usize {
        self.state.lock().changes.broadcast(&event)
    }

    /// Records and broadcasts the buffering percent of the playing track.
    pub fn emit_buffer(&self, track_id: TrackId, percent: u8) -> usize {
        let event = BufferEvent {
            track_id,
            percent: percent.min(100),
        };
        let mut state = self.state.lock();
        if state.buffer == Some(event) {
            return state.buffers.subscribers.len();
        }
        state.buffer = Some(event);
        state.buffers.broadcast(&event)
    }

    /// Forgets the buffering percent once nothing is playing.
    pub fn clear_buffer(&self) {
        self.state.lock().buffer = None;
    }

    pub fn current_buffer(&self) -> Option<BufferEvent> {
        self.state.lock().buffer
    }

    /// Updates the transfer table and broadcasts a Download event.
    pub fn emit_download(&self, event: DownloadEvent) -> usize {
        let mut state = self.state.lock();
        state.track_transfer(&event);
        state.downloads.broadcast(&event)
    }

    /// Track ids of transfers currently replayed to new Download listeners.
    pub fn tracked_transfers(&self) -> Vec<TrackId> {
        self.state.lock().transfers.keys().copied().collect()
    }
}

impl Default for ListenerHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl fmt::Debug for ListenerHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ListenerHub")
            .field("move_subscribers", &state.moves.subscribers.len())
            .field("change_subscribers", &state.changes.subscribers.len())
            .field("buffer_subscribers", &state.buffers.subscribers.len())
            .field("download_subscribers", &state.downloads.subscribers.len())
            .field("tracked_transfers", &state.transfers.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_move_events_reach_every_subscriber() {
        let hub = ListenerHub::new(8);
        let mut first = hub.subscribe_move();
        let mut second = hub.subscribe_move();

        let delivered = hub.emit_move(MoveEvent::Jump {
            position: 2,
            track_id: 30,
        });

        assert_eq!(delivered, 2);
        assert_eq!(
            first.recv().await,
            Some(MoveEvent::Jump {
                position: 2,
                track_id: 30
            })
        );
        assert_eq!(
            second.recv().await,
            Some(MoveEvent::Jump {
                position: 2,
                track_id: 30
            })
        );
    }

    #[tokio::test]
    async fn test_events_arrive_in_emission_order() {
        let hub = ListenerHub::new(8);
        let mut changes = hub.subscribe_change();

        hub.emit_change(ChangeEvent::Insert {
            position: 0,
            track_id: 1,
        });
        hub.emit_change(ChangeEvent::Move { from: 0, to: 1 });
        hub.emit_change(ChangeEvent::Clear);

        assert!(matches!(changes.recv().await, Some(ChangeEvent::Insert { .. })));
        assert!(matches!(changes.recv().await, Some(ChangeEvent::Move { .. })));
        assert_eq!(changes.recv().await, Some(ChangeEvent::Clear));
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_dropped_without_affecting_others() {
        let hub = ListenerHub::new(8);
        let gone = hub.subscribe_move();
        let mut alive = hub.subscribe_move();
        drop(gone);

        let remaining = hub.emit_move(MoveEvent::Stop);

        assert_eq!(remaining, 1);
        assert_eq!(hub.subscriber_count(ListenerChannel::Move), 1);
        assert_eq!(alive.recv().await, Some(MoveEvent::Stop));
    }

    #[tokio::test]
    async fn test_full_subscriber_is_dropped() {
        let hub = ListenerHub::new(1);
        let mut slow = hub.subscribe_move();

        hub.emit_move(MoveEvent::Unpause);
        hub.emit_move(MoveEvent::Stop);

        assert_eq!(hub.subscriber_count(ListenerChannel::Move), 0);
        assert_eq!(slow.recv().await, Some(MoveEvent::Unpause));
        assert_eq!(slow.recv().await, None);
    }

    #[tokio::test]
    async fn test_unregister() {
        let hub = ListenerHub::default();
        let sub = hub.subscribe_change();

        assert!(hub.unregister(ListenerChannel::Change, sub.id()));
        assert!(!hub.unregister(ListenerChannel::Change, sub.id()));
        assert!(!hub.unregister(ListenerChannel::Move, sub.id()));
        assert_eq!(hub.emit_change(ChangeEvent::Clear), 0);
    }

    #[tokio::test]
    async fn test_buffer_listener_gets_current_percent_on_join() {
        let hub = ListenerHub::new(8);
        hub.emit_buffer(5, 42);

        let mut late = hub.subscribe_buffer();
        assert_eq!(
            late.try_recv(),
            Some(BufferEvent {
                track_id: 5,
                percent: 42
            })
        );

        hub.clear_buffer();
        let mut later = hub.subscribe_buffer();
        assert_eq!(later.try_recv(), None);
    }

    #[tokio::test]
    async fn test_repeated_buffer_percent_is_not_rebroadcast() {
        let hub = ListenerHub::new(8);
        let mut sub = hub.subscribe_buffer();

        hub.emit_buffer(5, 10);
        hub.emit_buffer(5, 10);
        hub.emit_buffer(5, 150);

        assert_eq!(sub.try_recv().map(|e| e.percent), Some(10));
        assert_eq!(sub.try_recv().map(|e| e.percent), Some(100));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_download_listener_replays_tracked_transfers() {
        let hub = ListenerHub::new(8);
        hub.emit_download(DownloadEvent::Begin {
            track_id: 1,
            total_bytes: 1000,
        });
        hub.emit_download(DownloadEvent::Progress {
            track_id: 1,
            downloaded_bytes: 250,
            total_bytes: 1000,
        });

        let mut late = hub.subscribe_download();
        assert_eq!(
            late.try_recv(),
            Some(DownloadEvent::Begin {
                track_id: 1,
                total_bytes: 1000
            })
        );
        assert_eq!(
            late.try_recv(),
            Some(DownloadEvent::Progress {
                track_id: 1,
                downloaded_bytes: 250,
                total_bytes: 1000
            })
        );

        hub.emit_download(DownloadEvent::Progress {
            track_id: 1,
            downloaded_bytes: 500,
            total_bytes: 1000,
        });
        assert!(matches!(
            late.try_recv(),
            Some(DownloadEvent::Progress {
                downloaded_bytes: 500,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_finished_and_permanent_failures_are_untracked() {
        let hub = ListenerHub::new(8);
        for track_id in [1, 2, 3, 4] {
            hub.emit_download(DownloadEvent::Begin {
                track_id,
                total_bytes: 10,
            });
        }
        hub.emit_download(DownloadEvent::Finish { track_id: 1 });
        hub.emit_download(DownloadEvent::Cancel { track_id: 2 });
        hub.emit_download(DownloadEvent::Error {
            track_id: 3,
            message: "HTTP 404".into(),
            retryable: false,
        });
        hub.emit_download(DownloadEvent::Error {
            track_id: 4,
            message: "connection reset".into(),
            retryable: true,
        });

        assert_eq!(hub.tracked_transfers(), vec![4]);
    }

    #[tokio::test]
    async fn test_paused_transfer_replays_as_retryable_error() {
        let hub = ListenerHub::new(8);
        hub.emit_download(DownloadEvent::Begin {
            track_id: 1,
            total_bytes: 1000,
        });
        hub.emit_download(DownloadEvent::Progress {
            track_id: 1,
            downloaded_bytes: 300,
            total_bytes: 1000,
        });
        hub.emit_download(DownloadEvent::Error {
            track_id: 1,
            message: "connection reset".into(),
            retryable: true,
        });
        hub.emit_download(DownloadEvent::Begin {
            track_id: 2,
            total_bytes: 500,
        });

        let mut late = hub.subscribe_download();
        assert!(matches!(late.try_recv(), Some(DownloadEvent::Begin { track_id: 1, .. })));
        assert!(matches!(
            late.try_recv(),
            Some(DownloadEvent::Progress {
                track_id: 1,
                downloaded_bytes: 300,
                ..
            })
        ));
        assert_eq!(
            late.try_recv(),
            Some(DownloadEvent::Error {
                track_id: 1,
                message: "connection reset".into(),
                retryable: true
            })
        );
        assert!(matches!(late.try_recv(), Some(DownloadEvent::Begin { track_id: 2, .. })));
        assert!(matches!(
            late.try_recv(),
            Some(DownloadEvent::Progress {
                track_id: 2,
                downloaded_bytes: 0,
                ..
            })
        ));
        assert_eq!(late.try_recv(), None);

        // Resuming clears the paused marker.
        hub.emit_download(DownloadEvent::Begin {
            track_id: 1,
            total_bytes: 1000,
        });
        let mut resumed = hub.subscribe_download();
        let replay: Vec<_> = std::iter::from_fn(|| resumed.try_recv()).collect();
        assert!(!replay
            .iter()
            .any(|event| matches!(event, DownloadEvent::Error { .. })));
        assert!(replay.contains(&DownloadEvent::Progress {
            track_id: 1,
            downloaded_bytes: 300,
            total_bytes: 1000,
        }));
    }

    #[test]
    fn test_event_serialization() {
        let event = DownloadEvent::Progress {
            track_id: 9,
            downloaded_bytes: 5,
            total_bytes: 10,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"Progress\""));

        let back: DownloadEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.track_id(), 9);
    }

    #[test]
    fn test_move_descriptions() {
        assert_eq!(MoveEvent::Stop.description(), "Playback stopped");
        assert_eq!(
            MoveEvent::Seek { position_ms: 0 }.description(),
            "Seeked"
        );
    }
}
