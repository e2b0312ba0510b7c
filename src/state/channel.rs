use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::state::{room::RoomSnapshot, room_id::RoomId};

/// Fan-out of canonical room snapshots to every attached participant.
///
/// Implementations must deliver snapshots of one room in publication order; nothing is
/// promised across rooms.
pub trait SyncChannel: Send + Sync {
    /// Deliver `snapshot` to every listener currently attached to its room.
    fn publish(&self, snapshot: Arc<RoomSnapshot>);
    /// Attach a listener to `room_id`, receiving every snapshot published afterwards.
    fn attach(&self, room_id: &RoomId) -> broadcast::Receiver<Arc<RoomSnapshot>>;
    /// Drop the room's fan-out; attached listeners observe the channel closing.
    fn close(&self, room_id: &RoomId);
}

/// Hub realization: one Tokio broadcast channel per room, living in the authority process.
pub struct HubChannel {
    capacity: usize,
    rooms: DashMap<RoomId, broadcast::Sender<Arc<RoomSnapshot>>>,
}

impl HubChannel {
    /// Build a hub whose per-room channels buffer `capacity` snapshots per listener.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rooms: DashMap::new(),
        }
    }

    /// Number of listeners attached to `room_id`.
    #[cfg(test)]
    pub fn listeners(&self, room_id: &RoomId) -> usize {
        self.rooms
            .get(room_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl SyncChannel for HubChannel {
    fn publish(&self, snapshot: Arc<RoomSnapshot>) {
        if let Some(sender) = self.rooms.get(&snapshot.room_id) {
            // No listeners is not an error: the room may simply be empty.
            let _ = sender.send(snapshot);
        }
    }

    fn attach(&self, room_id: &RoomId) -> broadcast::Receiver<Arc<RoomSnapshot>> {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    fn close(&self, room_id: &RoomId) {
        self.rooms.remove(room_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        room::{RoomEvent, RoomState},
        room_id::RoomIdScheme,
    };

    #[tokio::test]
    async fn listeners_receive_snapshots_in_order() {
        let hub = HubChannel::new(8);
        let mut state = RoomState::new(RoomId::generate(RoomIdScheme::ShortCode));
        let mut rx = hub.attach(state.room_id());

        for id in ["a", "b", "c"] {
            state.apply(RoomEvent::Join {
                participant_id: id.into(),
                name: id.into(),
            });
            hub.publish(Arc::new(state.snapshot()));
        }

        for expected in 1..=3 {
            let snapshot = rx.recv().await.unwrap();
            assert_eq!(snapshot.version, expected);
        }
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let hub = HubChannel::new(8);
        let first = RoomState::new(RoomId::generate(RoomIdScheme::Opaque));
        let second = RoomState::new(RoomId::generate(RoomIdScheme::Opaque));
        let mut first_rx = hub.attach(first.room_id());
        let _second_rx = hub.attach(second.room_id());

        hub.publish(Arc::new(second.snapshot()));
        assert!(first_rx.try_recv().is_err());
        assert_eq!(hub.listeners(second.room_id()), 1);
    }

    #[tokio::test]
    async fn close_ends_attached_listeners() {
        let hub = HubChannel::new(8);
        let state = RoomState::new(RoomId::generate(RoomIdScheme::ShortCode));
        let mut rx = hub.attach(state.room_id());

        hub.close(state.room_id());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(hub.listeners(state.room_id()), 0);
    }
}
