//! Telephony call-state signals.
//!
//! Playback pauses for incoming and active calls and picks up again once the
//! line is idle.

use async_trait::async_trait;

use crate::error::Result;

/// Phone call state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// No call in progress
    Idle,
    /// Incoming call; `ringer_audible` is `false` in silent/vibrate mode
    Ringing { ringer_audible: bool },
    /// A call is active or being dialled
    OffHook,
}

impl CallState {
    /// Whether this state should interrupt audio output.
    pub fn interrupts_playback(&self) -> bool {
        match self {
            CallState::Idle => false,
            CallState::Ringing { ringer_audible } => *ringer_audible,
            CallState::OffHook => true,
        }
    }
}

/// Call-state source.
///
/// # Platform Support
///
/// - **Android**: `TelephonyManager` listener
/// - **iOS**: `CXCallObserver`
/// - **Desktop**: no telephony, stream never yields
#[async_trait]
pub trait CallStateMonitor: Send + Sync {
    /// Current call state
    async fn current_state(&self) -> Result<CallState>;

    /// Subscribe to call state transitions
    async fn subscribe_changes(&self) -> Result<Box<dyn CallStateStream>>;
}

/// Stream of call state transitions
#[async_trait]
pub trait CallStateStream: Send {
    /// Get the next call state
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<CallState>;
}
