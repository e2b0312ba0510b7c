use std::time::{Duration, Instant, SystemTime};

use indexmap::IndexMap;
use tracing::debug;

use crate::state::{
    deck::VoteValue,
    participant::{Participant, ParticipantId},
    room_id::RoomId,
};

/// Visible mode of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomMode {
    /// Votes are hidden; participants only see who has voted.
    Voting,
    /// Every cast vote is visible to everyone.
    Revealed,
}

/// Transitions that can be applied to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Register a participant; a repeated join for the same id changes nothing.
    Join {
        /// Identifier issued by the transport.
        participant_id: ParticipantId,
        /// Display name supplied by the client.
        name: String,
    },
    /// Record the caller's vote; ignored for unknown participants.
    Vote {
        /// Voting participant.
        participant_id: ParticipantId,
        /// Chosen card.
        value: VoteValue,
    },
    /// Make every vote visible.
    Reveal,
    /// Clear every vote and hide values again.
    Reset,
    /// Remove a participant; ignored when already gone.
    Leave {
        /// Departing participant.
        participant_id: ParticipantId,
    },
}

/// Whether an applied event modified the room.
///
/// Both variants still produce a snapshot to broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The room state changed.
    Changed,
    /// The event degraded to a no-op (duplicate join, stale vote, repeated reveal, ...).
    Unchanged,
}

/// Self-consistent copy of a room at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Room the snapshot belongs to.
    pub room_id: RoomId,
    /// Monotonic per-room counter; snapshot `n + 1` always follows `n`.
    pub version: u64,
    /// Whether votes are visible.
    pub revealed: bool,
    /// When the room was created.
    pub created_at: SystemTime,
    /// Members in join order.
    pub participants: Vec<Participant>,
}

impl RoomSnapshot {
    /// Current visible mode.
    pub fn mode(&self) -> RoomMode {
        if self.revealed {
            RoomMode::Revealed
        } else {
            RoomMode::Voting
        }
    }

    /// Look up a participant by id.
    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }
}

/// Authoritative state of a single room.
///
/// Every transition is a total function: inputs that look invalid (a vote from an id
/// that already left, a reveal with nobody in the room) are absorbed as no-ops because
/// membership races against transport events.
#[derive(Debug, Clone)]
pub struct RoomState {
    room_id: RoomId,
    participants: IndexMap<ParticipantId, Participant>,
    revealed: bool,
    created_at: SystemTime,
    version: u64,
    empty_since: Option<Instant>,
}

impl RoomState {
    /// Create an empty room in voting mode.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            participants: IndexMap::new(),
            revealed: false,
            created_at: SystemTime::now(),
            version: 0,
            empty_since: Some(Instant::now()),
        }
    }

    /// Identifier of the room.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Current visible mode.
    pub fn mode(&self) -> RoomMode {
        if self.revealed {
            RoomMode::Revealed
        } else {
            RoomMode::Voting
        }
    }

    /// Number of applied transitions.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether `id` is currently a member.
    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the room has no members.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Whether the room has been empty for at least `grace` at `now`.
    pub fn idle_for(&self, grace: Duration, now: Instant) -> bool {
        self.is_empty()
            && self
                .empty_since
                .is_some_and(|since| now.saturating_duration_since(since) >= grace)
    }

    /// Copy the current state for broadcasting.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            version: self.version,
            revealed: self.revealed,
            created_at: self.created_at,
            participants: self.participants.values().cloned().collect(),
        }
    }

    /// Apply a transition and bump the version.
    pub fn apply(&mut self, event: RoomEvent) -> Outcome {
        let outcome = match event {
            RoomEvent::Join {
                participant_id,
                name,
            } => self.join(participant_id, name),
            RoomEvent::Vote {
                participant_id,
                value,
            } => self.vote(&participant_id, value),
            RoomEvent::Reveal => self.reveal(),
            RoomEvent::Reset => self.reset(),
            RoomEvent::Leave { participant_id } => self.leave(&participant_id),
        };
        self.version += 1;
        outcome
    }

    fn join(&mut self, participant_id: ParticipantId, name: String) -> Outcome {
        if self.participants.contains_key(&participant_id) {
            debug!(room_id = %self.room_id, participant_id = %participant_id, "duplicate join ignored");
            return Outcome::Unchanged;
        }

        self.participants.insert(
            participant_id.clone(),
            Participant::new(participant_id, name),
        );
        self.empty_since = None;
        Outcome::Changed
    }

    fn vote(&mut self, participant_id: &str, value: VoteValue) -> Outcome {
        let Some(participant) = self.participants.get_mut(participant_id) else {
            debug!(room_id = %self.room_id, participant_id, "vote from unknown participant ignored");
            return Outcome::Unchanged;
        };

        if participant.vote == Some(value) {
            return Outcome::Unchanged;
        }
        participant.vote = Some(value);
        Outcome::Changed
    }

    fn reveal(&mut self) -> Outcome {
        if self.revealed {
            return Outcome::Unchanged;
        }
        self.revealed = true;
        Outcome::Changed
    }

    fn reset(&mut self) -> Outcome {
        let had_votes = self.participants.values().any(Participant::has_voted);
        if !self.revealed && !had_votes {
            return Outcome::Unchanged;
        }

        self.revealed = false;
        for participant in self.participants.values_mut() {
            participant.vote = None;
        }
        Outcome::Changed
    }

    fn leave(&mut self, participant_id: &str) -> Outcome {
        if self.participants.shift_remove(participant_id).is_none() {
            debug!(room_id = %self.room_id, participant_id, "leave for absent participant ignored");
            return Outcome::Unchanged;
        }

        if self.participants.is_empty() {
            self.empty_since = Some(Instant::now());
        }
        Outcome::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room_id::RoomIdScheme;

    fn room() -> RoomState {
        RoomState::new(RoomId::generate(RoomIdScheme::ShortCode))
    }

    fn join(room: &mut RoomState, id: &str) -> Outcome {
        room.apply(RoomEvent::Join {
            participant_id: id.into(),
            name: format!("name-{id}"),
        })
    }

    fn vote(room: &mut RoomState, id: &str, value: VoteValue) -> Outcome {
        room.apply(RoomEvent::Vote {
            participant_id: id.into(),
            value,
        })
    }

    fn votes(room: &RoomState) -> Vec<(String, Option<VoteValue>)> {
        room.snapshot()
            .participants
            .into_iter()
            .map(|p| (p.id, p.vote))
            .collect()
    }

    #[test]
    fn new_room_is_empty_and_voting() {
        let room = room();
        assert!(room.is_empty());
        assert_eq!(room.mode(), RoomMode::Voting);
        assert_eq!(room.version(), 0);
    }

    #[test]
    fn joins_keep_one_entry_per_id_in_join_order() {
        let mut room = room();
        for id in ["c", "a", "b", "a", "c", "a"] {
            join(&mut room, id);
        }

        let ids: Vec<String> = room.snapshot().participants.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn duplicate_join_is_a_noop_that_keeps_the_vote() {
        let mut room = room();
        assert_eq!(join(&mut room, "a"), Outcome::Changed);
        vote(&mut room, "a", VoteValue::Points(5));

        assert_eq!(join(&mut room, "a"), Outcome::Unchanged);
        assert_eq!(room.len(), 1);
        assert_eq!(votes(&room), [("a".to_string(), Some(VoteValue::Points(5)))]);
    }

    #[test]
    fn vote_from_unknown_participant_changes_nothing() {
        let mut room = room();
        join(&mut room, "a");
        let before = room.snapshot();

        assert_eq!(vote(&mut room, "ghost", VoteValue::Points(8)), Outcome::Unchanged);
        let after = room.snapshot();
        assert_eq!(after.participants, before.participants);
        assert!(!room.contains("ghost"));
    }

    #[test]
    fn voting_while_revealed_updates_the_value() {
        let mut room = room();
        join(&mut room, "a");
        room.apply(RoomEvent::Reveal);

        assert_eq!(vote(&mut room, "a", VoteValue::Unknown), Outcome::Changed);
        assert_eq!(room.mode(), RoomMode::Revealed);
        assert_eq!(votes(&room), [("a".to_string(), Some(VoteValue::Unknown))]);
    }

    #[test]
    fn reveal_on_empty_room_is_vacuous_and_idempotent() {
        let mut room = room();
        assert_eq!(room.apply(RoomEvent::Reveal), Outcome::Changed);
        assert_eq!(room.apply(RoomEvent::Reveal), Outcome::Unchanged);
        assert_eq!(room.mode(), RoomMode::Revealed);
        assert_eq!(room.version(), 2);
    }

    #[test]
    fn reveal_then_reset_clears_everything_from_any_state() {
        let mut room = room();
        join(&mut room, "a");
        join(&mut room, "b");
        join(&mut room, "c");
        vote(&mut room, "a", VoteValue::Points(3));
        vote(&mut room, "c", VoteValue::Unknown);

        room.apply(RoomEvent::Reveal);
        room.apply(RoomEvent::Reset);

        assert_eq!(room.mode(), RoomMode::Voting);
        assert!(votes(&room).iter().all(|(_, vote)| vote.is_none()));
        assert_eq!(room.len(), 3);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut room = room();
        join(&mut room, "a");
        vote(&mut room, "a", VoteValue::Points(13));
        room.apply(RoomEvent::Reveal);

        assert_eq!(room.apply(RoomEvent::Reset), Outcome::Changed);
        let once = room.snapshot();
        assert_eq!(room.apply(RoomEvent::Reset), Outcome::Unchanged);
        let twice = room.snapshot();

        assert_eq!(once.participants, twice.participants);
        assert_eq!(once.revealed, twice.revealed);
        assert_eq!(twice.version, once.version + 1);
    }

    #[test]
    fn leave_mid_round_drops_the_vote_from_the_reveal() {
        let mut room = room();
        join(&mut room, "a");
        join(&mut room, "b");
        vote(&mut room, "a", VoteValue::Points(5));
        vote(&mut room, "b", VoteValue::Points(8));

        room.apply(RoomEvent::Leave {
            participant_id: "a".into(),
        });
        room.apply(RoomEvent::Reveal);

        assert_eq!(votes(&room), [("b".to_string(), Some(VoteValue::Points(8)))]);
    }

    #[test]
    fn leave_of_absent_id_is_a_noop() {
        let mut room = room();
        join(&mut room, "a");
        let outcome = room.apply(RoomEvent::Leave {
            participant_id: "nobody".into(),
        });
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn emptying_a_revealed_room_keeps_revealed_until_reset() {
        let mut room = room();
        join(&mut room, "a");
        room.apply(RoomEvent::Reveal);
        room.apply(RoomEvent::Leave {
            participant_id: "a".into(),
        });

        assert!(room.is_empty());
        assert_eq!(room.mode(), RoomMode::Revealed);

        join(&mut room, "b");
        assert_eq!(room.mode(), RoomMode::Revealed);
        assert_eq!(votes(&room), [("b".to_string(), None)]);
    }

    #[test]
    fn idle_window_starts_when_the_last_participant_leaves() {
        let mut room = room();
        let grace = Duration::from_secs(60);
        join(&mut room, "a");
        assert!(!room.idle_for(Duration::ZERO, Instant::now()));

        room.apply(RoomEvent::Leave {
            participant_id: "a".into(),
        });
        assert!(room.idle_for(Duration::ZERO, Instant::now()));
        assert!(!room.idle_for(grace, Instant::now()));
        assert!(room.idle_for(grace, Instant::now() + grace));
    }

    #[test]
    fn versions_increase_on_every_applied_event() {
        let mut room = room();
        join(&mut room, "a");
        vote(&mut room, "ghost", VoteValue::Points(1));
        room.apply(RoomEvent::Reveal);
        assert_eq!(room.snapshot().version, 3);
    }
}
