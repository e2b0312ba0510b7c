use std::time::Instant;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::state::{SharedState, room_id::RoomId};

/// Run one eviction pass: drop every room that stayed empty past the grace window.
///
/// The fan-out of each evicted room is closed before its id can be reused.
pub fn sweep(state: &SharedState, now: Instant) -> Vec<RoomId> {
    let grace = state.config().empty_room_grace;
    let evicted = state
        .registry()
        .evict_idle(grace, now, |room_id| state.channel().close(room_id));

    for room_id in &evicted {
        info!(room_id = %room_id, "evicted idle room");
    }
    evicted
}

/// Sweep the registry on the configured interval until shutdown begins.
pub async fn run(state: SharedState) {
    let interval = state.config().eviction_sweep_interval;
    let mut shutdown = state.shutdown_watcher();

    while !*shutdown.borrow_and_update() {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = sleep(interval) => {
                let evicted = sweep(&state, Instant::now());
                debug!(evicted = evicted.len(), remaining = state.registry().len(), "eviction sweep finished");
            }
        }
    }

    info!("eviction supervisor stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        services::room_service,
        state::{AppState, HubChannel, SyncChannel},
    };

    #[tokio::test]
    async fn sweep_evicts_rooms_empty_past_grace() {
        let state = AppState::new(AppConfig {
            empty_room_grace: Duration::from_secs(60),
            ..AppConfig::default()
        });
        let idle = room_service::create_room(&state).unwrap().room_id;
        let busy = room_service::create_room(&state).unwrap().room_id;
        room_service::join(&state, &busy, "a".into(), "Ada".into())
            .await
            .unwrap();

        assert!(sweep(&state, Instant::now()).is_empty());

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(sweep(&state, later), [idle.clone()]);
        assert!(state.registry().get(&idle).is_none());
        assert!(state.registry().get(&busy).is_some());
    }

    #[tokio::test]
    async fn eviction_closes_the_room_channel() {
        let channel = std::sync::Arc::new(HubChannel::new(4));
        let state = AppState::with_channel(
            AppConfig {
                empty_room_grace: Duration::ZERO,
                ..AppConfig::default()
            },
            channel.clone(),
        );
        let room_id = room_service::create_room(&state).unwrap().room_id;
        let mut listener = channel.attach(&room_id);

        assert_eq!(sweep(&state, Instant::now()), [room_id.clone()]);
        assert_eq!(channel.listeners(&room_id), 0);
        assert!(listener.recv().await.is_err());
    }

    #[tokio::test]
    async fn supervisor_stops_on_shutdown() {
        let state = AppState::new(AppConfig::default());
        let task = tokio::spawn(run(state.clone()));
        state.begin_shutdown();
        task.await.unwrap();
    }
}
