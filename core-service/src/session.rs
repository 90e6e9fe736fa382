//! Client sessions and the deferred-shutdown timer.
//!
//! The engine outlives any single remote-control client. When the last
//! client goes away and nothing is playing, a timer starts; if it runs out
//! before a client reconnects or playback resumes, the service reports that
//! it may be shut down.

use core_playback::PlayState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Guard for one connected command-surface client.
///
/// The client counts as connected until the guard is dropped.
#[derive(Debug)]
pub struct ClientSession {
    clients: Arc<watch::Sender<usize>>,
}

impl ClientSession {
    pub(crate) fn new(clients: Arc<watch::Sender<usize>>) -> Self {
        clients.send_modify(|count| *count += 1);
        debug!(clients = *clients.borrow(), "Client connected");
        Self { clients }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.clients
            .send_modify(|count| *count = count.saturating_sub(1));
        debug!(clients = *self.clients.borrow(), "Client disconnected");
    }
}

/// Watches client count and player state, firing `fired` once the engine has
/// been idle for `delay`. A player that is preparing counts as playing.
pub(crate) struct IdleMonitor {
    pub clients: watch::Receiver<usize>,
    pub states: watch::Receiver<PlayState>,
    pub delay: Duration,
    pub fired: CancellationToken,
    pub stop: CancellationToken,
}

impl IdleMonitor {
    pub(crate) async fn run(self) {
        let IdleMonitor {
            mut clients,
            mut states,
            delay,
            fired,
            stop,
        } = self;

        let mut states_open = true;
        let mut deadline: Option<Instant> = None;

        loop {
            let playing = states.borrow_and_update().is_playing();
            let idle = *clients.borrow() == 0 && !playing;
            match (idle, deadline) {
                (true, None) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Idle shutdown timer armed");
                    deadline = Some(Instant::now() + delay);
                }
                (false, Some(_)) => {
                    debug!("Idle shutdown timer cancelled");
                    deadline = None;
                }
                _ => {}
            }

            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = stop.cancelled() => return,
                _ = timer => {
                    info!("Engine idle with no clients; requesting shutdown");
                    fired.cancel();
                    return;
                }
                changed = clients.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                changed = states.changed(), if states_open => {
                    if changed.is_err() {
                        warn!("Idle monitor lost the player state");
                        states_open = false;
                    }
                }
            }
        }
    }
}
