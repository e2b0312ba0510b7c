use std::time::Instant;

use uuid::Uuid;

use crate::state::deck::VoteValue;

/// Opaque participant identifier issued by the hub when a connection is accepted.
pub type ParticipantId = String;

/// Issue a fresh participant identifier; identifiers are never reused.
pub fn new_participant_id() -> ParticipantId {
    Uuid::new_v4().simple().to_string()
}

/// A single room member and their vote for the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Identifier assigned by the transport.
    pub id: ParticipantId,
    /// Display name supplied at join time (not unique).
    pub name: String,
    /// Current vote, `None` until the participant picks a card this round.
    pub vote: Option<VoteValue>,
    /// When the participant joined; only used to keep the display order stable.
    pub joined_at: Instant,
}

impl Participant {
    /// Build a participant that has not voted yet.
    pub fn new(id: ParticipantId, name: String) -> Self {
        Self {
            id,
            name,
            vote: None,
            joined_at: Instant::now(),
        }
    }

    /// Whether a vote was cast in the current round.
    pub fn has_voted(&self) -> bool {
        self.vote.is_some()
    }
}
