//! Platform signal watchers.
//!
//! Each watcher forwards one host signal stream into the player until the
//! stream ends, the player stops or the service shuts down.

use bridge_traits::{CallStateMonitor, NetworkMonitor};
use core_playback::PlayerHandle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Forward call-state transitions to the player.
pub(crate) async fn watch_call_state(
    monitor: Arc<dyn CallStateMonitor>,
    player: PlayerHandle,
    stop: CancellationToken,
) {
    let mut changes = match monitor.subscribe_changes().await {
        Ok(changes) => changes,
        Err(e) => {
            warn!(error = %e, "Call state monitoring unavailable");
            return;
        }
    };

    loop {
        let state = tokio::select! {
            _ = stop.cancelled() => return,
            state = changes.next() => match state {
                Some(state) => state,
                None => {
                    debug!("Call state stream closed");
                    return;
                }
            },
        };

        debug!(state = ?state, "Call state changed");
        if player.notify_call_state(state).await.is_err() {
            return;
        }
    }
}

/// Resume paused downloads whenever connectivity comes back.
pub(crate) async fn watch_network(
    monitor: Arc<dyn NetworkMonitor>,
    player: PlayerHandle,
    stop: CancellationToken,
) {
    let mut connected = match monitor.get_network_info().await {
        Ok(info) => info.is_connected(),
        Err(e) => {
            warn!(error = %e, "Initial network probe failed");
            false
        }
    };

    let mut changes = match monitor.subscribe_changes().await {
        Ok(changes) => changes,
        Err(e) => {
            warn!(error = %e, "Network monitoring unavailable");
            return;
        }
    };

    loop {
        let info = tokio::select! {
            _ = stop.cancelled() => return,
            info = changes.next() => match info {
                Some(info) => info,
                None => {
                    debug!("Network change stream closed");
                    return;
                }
            },
        };

        let now_connected = info.is_connected();
        if now_connected && !connected {
            info!(network_type = ?info.network_type, "Connectivity restored");
            if player.notify_connectivity_restored().await.is_err() {
                return;
            }
        }
        connected = now_connected;
    }
}
