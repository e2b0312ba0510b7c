use dashmap::DashMap;

use crate::state::{participant::ParticipantId, room_id::RoomId};

/// Tracks which room every joined connection belongs to.
///
/// A participant id is issued per connection, so it doubles as the connection key.
/// Departure signals can arrive more than once for the same connection (explicit
/// `leave`, socket close, heartbeat expiry); [`PresenceMonitor::release`] hands the
/// binding out exactly once so only one `Leave` transition follows.
#[derive(Default)]
pub struct PresenceMonitor {
    bindings: DashMap<ParticipantId, RoomId>,
}

impl PresenceMonitor {
    /// Create an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `participant_id` joined `room_id`.
    pub fn bind(&self, participant_id: ParticipantId, room_id: RoomId) {
        self.bindings.insert(participant_id, room_id);
    }

    /// Take the binding for a departing participant; `None` if it was already released.
    pub fn release(&self, participant_id: &str) -> Option<RoomId> {
        self.bindings
            .remove(participant_id)
            .map(|(_, room_id)| room_id)
    }

    /// Room the participant is bound to, if any.
    #[cfg(test)]
    pub fn room_of(&self, participant_id: &str) -> Option<RoomId> {
        self.bindings
            .get(participant_id)
            .map(|entry| entry.value().clone())
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no connection is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room_id::RoomIdScheme;

    #[test]
    fn duplicate_disconnects_release_once() {
        let presence = PresenceMonitor::new();
        let room_id = RoomId::generate(RoomIdScheme::ShortCode);
        presence.bind("p1".into(), room_id.clone());

        assert_eq!(presence.release("p1"), Some(room_id));
        assert_eq!(presence.release("p1"), None);
        assert!(presence.is_empty());
    }

    #[test]
    fn releasing_an_unknown_connection_is_harmless() {
        let presence = PresenceMonitor::new();
        assert_eq!(presence.release("never-joined"), None);
    }

    #[test]
    fn room_of_follows_bindings() {
        let presence = PresenceMonitor::new();
        let room_id = RoomId::generate(RoomIdScheme::Opaque);
        presence.bind("p1".into(), room_id.clone());
        presence.bind("p2".into(), room_id.clone());

        assert_eq!(presence.room_of("p2"), Some(room_id));
        assert_eq!(presence.len(), 2);
    }
}
