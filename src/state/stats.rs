//! Aggregates shown once a round is revealed.

use std::collections::HashMap;

use crate::state::{
    deck::{Deck, VoteValue},
    room::RoomSnapshot,
};

/// How many participants picked a given card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyEntry {
    /// The card.
    pub value: VoteValue,
    /// Number of participants who picked it.
    pub count: usize,
}

/// Aggregation over numeric votes only.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    /// Number of numeric votes.
    pub count: usize,
    /// Arithmetic mean.
    pub average: f64,
    /// Smallest numeric vote.
    pub min: u32,
    /// Largest numeric vote.
    pub max: u32,
}

/// Statistics for one revealed round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundStatistics {
    /// Every distinct cast value, most popular first, ties in deck order.
    pub tally: Vec<TallyEntry>,
    /// `None` when nobody cast a numeric vote.
    pub numeric: Option<NumericSummary>,
}

impl RoundStatistics {
    /// Aggregate the cast votes; `Unknown` is tallied but kept out of the numeric summary.
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a VoteValue>) -> Self {
        let mut counts: HashMap<VoteValue, usize> = HashMap::new();
        let mut numeric: Vec<u32> = Vec::new();

        for vote in votes {
            *counts.entry(*vote).or_default() += 1;
            if let Some(points) = vote.points() {
                numeric.push(points);
            }
        }

        let mut tally: Vec<TallyEntry> = counts
            .into_iter()
            .map(|(value, count)| TallyEntry { value, count })
            .collect();
        tally.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| Deck::position(&a.value).cmp(&Deck::position(&b.value)))
                .then_with(|| a.value.points().cmp(&b.value.points()))
        });

        let numeric = match (numeric.iter().min(), numeric.iter().max()) {
            (Some(&min), Some(&max)) => {
                let sum: u64 = numeric.iter().map(|&points| u64::from(points)).sum();
                Some(NumericSummary {
                    count: numeric.len(),
                    average: sum as f64 / numeric.len() as f64,
                    min,
                    max,
                })
            }
            _ => None,
        };

        Self { tally, numeric }
    }

    /// Aggregate the votes of every current participant in `snapshot`.
    pub fn from_snapshot(snapshot: &RoomSnapshot) -> Self {
        Self::from_votes(snapshot.participants.iter().filter_map(|p| p.vote.as_ref()))
    }
}
