//! Room authority: the single place where participant actions become room transitions.

use std::{sync::Arc, time::SystemTime};

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    dto::{
        format_system_time,
        room::{CreateRoomResponse, DeckResponse},
        snapshot::StateUpdate,
    },
    error::ServiceError,
    state::{
        RoomHandle, SharedState,
        deck::{Deck, VoteValue},
        participant::ParticipantId,
        room::{RoomEvent, RoomSnapshot},
        room_id::RoomId,
    },
};

const MAX_ID_ATTEMPTS: usize = 16;
const MAX_JOIN_ATTEMPTS: usize = 2;

/// A participant freshly registered in a room.
pub struct JoinedRoom {
    /// Room the participant belongs to.
    pub room: RoomHandle,
    /// Snapshots published after the join, the join itself included.
    pub updates: broadcast::Receiver<Arc<RoomSnapshot>>,
}

/// Normalize a client-supplied room identifier according to the configured scheme.
pub fn parse_room_id(state: &SharedState, raw: &str) -> Result<RoomId, ServiceError> {
    Ok(RoomId::parse(state.config().room_id_scheme, raw)?)
}

/// Apply `event` to the room and publish the resulting snapshot.
///
/// The snapshot is published while the room lock is held, so listeners observe versions
/// in the order the transitions were applied.
pub async fn handle_event(
    state: &SharedState,
    room_id: &RoomId,
    event: RoomEvent,
) -> Result<Arc<RoomSnapshot>, ServiceError> {
    let room = state
        .registry()
        .get(room_id)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}`")))?;
    apply_and_publish(state, &room, event).await
}

async fn apply_and_publish(
    state: &SharedState,
    room: &RoomHandle,
    event: RoomEvent,
) -> Result<Arc<RoomSnapshot>, ServiceError> {
    let mut guard = room.lock().await;
    if room.is_evicted() {
        return Err(ServiceError::RoomClosed);
    }

    let outcome = guard.apply(event);
    debug!(
        room_id = %room.id(),
        version = guard.version(),
        mode = ?guard.mode(),
        members = guard.len(),
        ?outcome,
        "room transition applied"
    );
    let snapshot = Arc::new(guard.snapshot());
    state.channel().publish(snapshot.clone());
    Ok(snapshot)
}

/// Register `participant_id` in the room and attach it to the room's snapshots.
///
/// Unknown rooms are created on the fly when `auto_create_rooms` is enabled and rejected
/// otherwise.
pub async fn join(
    state: &SharedState,
    room_id: &RoomId,
    participant_id: ParticipantId,
    name: String,
) -> Result<JoinedRoom, ServiceError> {
    let name = name.trim().to_string();

    for _ in 0..MAX_JOIN_ATTEMPTS {
        let room = if state.config().auto_create_rooms {
            state.registry().get_or_create(room_id.clone())
        } else {
            state
                .registry()
                .get(room_id)
                .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}`")))?
        };

        let mut guard = room.lock().await;
        if room.is_evicted() {
            // Lost the race against the eviction sweep; look the id up again.
            continue;
        }

        let updates = state.channel().attach(room.id());
        guard.apply(RoomEvent::Join {
            participant_id: participant_id.clone(),
            name: name.clone(),
        });
        state
            .presence()
            .bind(participant_id.clone(), room.id().clone());

        let snapshot = Arc::new(guard.snapshot());
        state.channel().publish(snapshot);
        drop(guard);

        info!(room_id = %room_id, participant_id = %participant_id, "participant joined");
        return Ok(JoinedRoom { room, updates });
    }

    Err(ServiceError::RoomClosed)
}

/// Record a vote, rejecting cards outside the deck when `strict_votes` is enabled.
pub async fn vote(
    state: &SharedState,
    room_id: &RoomId,
    participant_id: &str,
    value: VoteValue,
) -> Result<Arc<RoomSnapshot>, ServiceError> {
    if state.config().strict_votes && !Deck::contains(&value) {
        return Err(ServiceError::InvalidInput(format!(
            "`{value}` is not a card of the deck"
        )));
    }

    handle_event(
        state,
        room_id,
        RoomEvent::Vote {
            participant_id: participant_id.to_string(),
            value,
        },
    )
    .await
}

/// Remove `participant_id` from its room.
///
/// Safe to call for every disconnect signal: only the first call for a binding applies
/// a `Leave`, later ones return `Ok(None)`.
pub async fn leave(
    state: &SharedState,
    participant_id: &str,
) -> Result<Option<Arc<RoomSnapshot>>, ServiceError> {
    let Some(room_id) = state.presence().release(participant_id) else {
        return Ok(None);
    };

    info!(room_id = %room_id, participant_id = %participant_id, "participant left");
    let snapshot = handle_event(
        state,
        &room_id,
        RoomEvent::Leave {
            participant_id: participant_id.to_string(),
        },
    )
    .await?;
    Ok(Some(snapshot))
}

/// Create a room under a freshly generated identifier.
pub fn create_room(state: &SharedState) -> Result<CreateRoomResponse, ServiceError> {
    let config = state.config();

    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = RoomId::generate(config.room_id_scheme);
        let Some(room) = state.registry().create(candidate) else {
            debug!("generated room id already taken; retrying");
            continue;
        };

        info!(room_id = %room.id(), "room created");
        return Ok(CreateRoomResponse {
            share_url: config.share_url(room.id()),
            room_id: room.id().clone(),
            created_at: format_system_time(SystemTime::now()),
        });
    }

    Err(ServiceError::Conflict(
        "could not allocate a free room id".into(),
    ))
}

/// Current state of a room as seen by an anonymous observer.
pub async fn room_snapshot(
    state: &SharedState,
    room_id: &RoomId,
) -> Result<StateUpdate, ServiceError> {
    let room = state
        .registry()
        .get(room_id)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}`")))?;
    let guard = room.lock().await;
    if room.is_evicted() {
        return Err(ServiceError::NotFound(format!("room `{room_id}`")));
    }
    Ok(StateUpdate::for_viewer(&guard.snapshot(), None))
}

/// The selectable cards.
pub fn deck() -> DeckResponse {
    DeckResponse {
        values: Deck::values().to_vec(),
    }
}
