use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{
    deck::VoteValue,
    participant::ParticipantId,
    room::{RoomMode, RoomSnapshot},
    room_id::RoomId,
    stats::{NumericSummary, RoundStatistics, TallyEntry},
};

/// Canonical room snapshot as delivered to one viewer.
///
/// While the room is voting, other participants' values are never included: only the
/// `hasVoted` flag travels. The viewer's own vote is echoed back as `ownVote`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    /// Room the snapshot belongs to.
    pub room_id: RoomId,
    /// Monotonic per-room snapshot counter.
    pub version: u64,
    /// Whether votes are visible.
    pub revealed: bool,
    /// Members in join order.
    pub participants: Vec<ParticipantView>,
    /// The viewer's own current vote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub own_vote: Option<VoteValue>,
    /// Every cast vote keyed by participant id; present only when revealed.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<std::collections::HashMap<String, VoteValue>>)]
    pub votes_by_participant: Option<IndexMap<ParticipantId, VoteValue>>,
    /// Round statistics; present only when revealed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<StatisticsView>,
}

impl StateUpdate {
    /// Render `snapshot` for `viewer`; `None` renders the anonymous observer view.
    pub fn for_viewer(snapshot: &RoomSnapshot, viewer: Option<&str>) -> Self {
        let participants = snapshot
            .participants
            .iter()
            .map(|p| ParticipantView {
                id: p.id.clone(),
                name: p.name.clone(),
                has_voted: p.has_voted(),
            })
            .collect();

        let own_vote = viewer
            .and_then(|id| snapshot.participant(id))
            .and_then(|p| p.vote);

        let (votes_by_participant, statistics) = if snapshot.mode() == RoomMode::Revealed {
            let votes: IndexMap<ParticipantId, VoteValue> = snapshot
                .participants
                .iter()
                .filter_map(|p| p.vote.map(|vote| (p.id.clone(), vote)))
                .collect();
            let stats = RoundStatistics::from_snapshot(snapshot);
            (Some(votes), Some(StatisticsView::from(stats)))
        } else {
            (None, None)
        };

        Self {
            room_id: snapshot.room_id.clone(),
            version: snapshot.version,
            revealed: snapshot.revealed,
            participants,
            own_vote,
            votes_by_participant,
            statistics,
        }
    }
}

/// Public view of one participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// Whether a vote was cast this round.
    pub has_voted: bool,
}

/// Round statistics as sent to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatisticsView {
    /// Every distinct cast value, most popular first.
    pub tally: Vec<TallyView>,
    /// Aggregation over numeric votes; absent when none was cast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericView>,
}

/// Number of votes for one card.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TallyView {
    /// The card.
    pub value: VoteValue,
    /// Number of votes.
    pub count: usize,
}

/// Numeric aggregation as sent to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NumericView {
    /// Number of numeric votes.
    pub count: usize,
    /// Arithmetic mean.
    pub average: f64,
    /// Smallest numeric vote.
    pub min: u32,
    /// Largest numeric vote.
    pub max: u32,
}

impl From<RoundStatistics> for StatisticsView {
    fn from(value: RoundStatistics) -> Self {
        Self {
            tally: value.tally.into_iter().map(Into::into).collect(),
            numeric: value.numeric.map(Into::into),
        }
    }
}

impl From<TallyEntry> for TallyView {
    fn from(value: TallyEntry) -> Self {
        Self {
            value: value.value,
            count: value.count,
        }
    }
}

impl From<NumericSummary> for NumericView {
    fn from(value: NumericSummary) -> Self {
        Self {
            count: value.count,
            average: value.average,
            min: value.min,
            max: value.max,
        }
    }
}
