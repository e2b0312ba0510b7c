use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dto::{snapshot::StateUpdate, sse::ServerEvent},
    error::ServiceError,
    state::{SHUTDOWN_REASON, SharedState, room::RoomSnapshot, room_id::RoomId},
};

const EVENT_STATE_UPDATE: &str = "stateUpdate";
const EVENT_SHUTDOWN: &str = "shutdown";
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// An observer attached to one room.
pub struct RoomSubscription {
    /// Room state at attach time.
    pub current: Arc<RoomSnapshot>,
    /// Snapshots published after `current`.
    pub updates: broadcast::Receiver<Arc<RoomSnapshot>>,
}

/// Attach an anonymous observer to an existing room.
///
/// Attaching and reading the current state happen under the room lock, so the observer
/// misses no version and sees none twice.
pub async fn subscribe_room(
    state: &SharedState,
    room_id: &RoomId,
) -> Result<RoomSubscription, ServiceError> {
    let room = state
        .registry()
        .get(room_id)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}`")))?;
    let guard = room.lock().await;
    if room.is_evicted() {
        return Err(ServiceError::NotFound(format!("room `{room_id}`")));
    }

    let updates = state.channel().attach(room_id);
    Ok(RoomSubscription {
        current: Arc::new(guard.snapshot()),
        updates,
    })
}

/// Render a snapshot as the observer `stateUpdate` event.
pub fn observer_event(snapshot: &RoomSnapshot) -> serde_json::Result<ServerEvent> {
    ServerEvent::json(
        Some(EVENT_STATE_UPDATE.to_string()),
        &StateUpdate::for_viewer(snapshot, None),
    )
}

/// Convert a room subscription into an SSE response, forwarding snapshots until the
/// client disconnects, the room is evicted or shutdown begins.
///
/// On shutdown a final `shutdown` event is sent and the stream ends.
pub fn to_sse_stream(
    subscription: RoomSubscription,
    mut shutdown: watch::Receiver<bool>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let RoomSubscription {
        current,
        mut updates,
    } = subscription;
    let room_id = current.room_id.clone();

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let mut next = Some(current);
        loop {
            if *shutdown.borrow_and_update() {
                let farewell = Event::default().event(EVENT_SHUTDOWN).data(SHUTDOWN_REASON);
                let _ = tx.send(Ok(farewell)).await;
                info!(room_id = %room_id, "closing observer SSE stream for shutdown");
                break;
            }

            let snapshot = match next.take() {
                Some(snapshot) => snapshot,
                None => tokio::select! {
                    _ = tx.closed() => break,
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    recv_result = updates.recv() => match recv_result {
                        Ok(snapshot) => snapshot,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(room_id = %room_id, skipped, "observer lagging behind room updates");
                            continue;
                        }
                    },
                },
            };

            let payload = match observer_event(&snapshot) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(room_id = %room_id, error = %err, "failed to serialize observer event");
                    continue;
                }
            };
            let mut event = Event::default().data(payload.data);
            if let Some(name) = payload.event {
                event = event.event(name);
            }
            if tx.send(Ok(event)).await.is_err() {
                break;
            }
        }

        info!(room_id = %room_id, "observer SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        services::room_service,
        state::{AppState, deck::VoteValue},
    };

    #[tokio::test]
    async fn observers_start_from_the_current_state() {
        let state = AppState::new(AppConfig::default());
        let created = room_service::create_room(&state).unwrap();
        room_service::join(&state, &created.room_id, "a".into(), "Ada".into())
            .await
            .unwrap();

        let mut subscription = subscribe_room(&state, &created.room_id).await.unwrap();
        assert_eq!(subscription.current.participants.len(), 1);

        room_service::vote(&state, &created.room_id, "a", VoteValue::Points(8))
            .await
            .unwrap();
        let next = subscription.updates.recv().await.unwrap();
        assert_eq!(next.version, subscription.current.version + 1);

        let event = observer_event(&next).unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_STATE_UPDATE));
        assert!(!event.data.contains("ownVote"));
        assert!(!event.data.contains("votesByParticipant"));
        assert!(event.data.contains(r#""hasVoted":true"#));
    }

    #[tokio::test]
    async fn unknown_rooms_cannot_be_observed() {
        let state = AppState::new(AppConfig::default());
        let room_id = room_service::parse_room_id(&state, "ZZZZZZ").unwrap();
        let err = subscribe_room(&state, &room_id).await.err().unwrap();
        assert_eq!(err.code(), "room_not_found");
    }
}
