//! Messages accepted by the controller actor.

use crate::controller::PlayState;
use crate::download::Download;
use bridge_traits::{CallState, TrackId};
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub(crate) enum Command {
    // ---- transport controls ----------------------------------------------
    Play(Reply<()>),
    Pause(Reply<()>),
    Unpause(Reply<()>),
    Stop(Reply<()>),
    Seek {
        position_ms: u64,
        reply: Reply<()>,
    },
    Next(Reply<()>),
    Previous(Reply<()>),
    Jump {
        position: i32,
        reply: Reply<()>,
    },

    // ---- queue mutations --------------------------------------------------
    Insert {
        track_id: TrackId,
        position: i32,
        reply: Reply<()>,
    },
    Prepend {
        track_id: TrackId,
        reply: Reply<()>,
    },
    Append {
        track_id: TrackId,
        reply: Reply<()>,
    },
    InsertNext {
        track_id: TrackId,
        reply: Reply<()>,
    },
    Remove {
        position: i32,
        reply: Reply<()>,
    },
    Move {
        from: i32,
        to: i32,
        reply: Reply<()>,
    },
    Clear(Reply<()>),

    // ---- queries ----------------------------------------------------------
    Playlist(Reply<Vec<TrackId>>),
    Position(Reply<i32>),
    Tell(Reply<i64>),
    Duration(Reply<i64>),
    State(Reply<PlayState>),
    SongAt {
        position: i32,
        reply: Reply<Option<TrackId>>,
    },
    PositionOf {
        track_id: TrackId,
        reply: Reply<i32>,
    },
    PeekNext(Reply<i32>),
    Downloads(Reply<Vec<Download>>),

    // ---- signals ----------------------------------------------------------
    CallState(CallState),
    ConnectivityRestored,

    Shutdown(Reply<()>),
}

impl Command {
    /// Whether the command can change queue or play state.
    pub(crate) fn is_query(&self) -> bool {
        matches!(
            self,
            Command::Playlist(_)
                | Command::Position(_)
                | Command::Tell(_)
                | Command::Duration(_)
                | Command::State(_)
                | Command::SongAt { .. }
                | Command::PositionOf { .. }
                | Command::PeekNext(_)
                | Command::Downloads(_)
        )
    }
}
