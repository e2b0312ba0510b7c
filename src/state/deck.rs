//! The fixed card sequence participants pick their estimates from.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use utoipa::{
    PartialSchema, ToSchema,
    openapi::{
        ObjectBuilder, OneOfBuilder, RefOr,
        schema::{Schema, Type},
    },
};

/// Wire representation of the "unknown" card.
pub const UNKNOWN_SYMBOL: &str = "?";

/// A single estimation value: either a number of points or the unknown sentinel.
///
/// The numeric range is deliberately wider than the deck so that rooms stay opaque to
/// the value domain; membership in [`Deck`] is checked at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteValue {
    /// A numeric estimate, included in statistics.
    Points(u32),
    /// The `?` card: counted in tallies, excluded from numeric aggregation.
    Unknown,
}

impl VoteValue {
    /// Whether the value takes part in numeric aggregation.
    pub fn is_numeric(&self) -> bool {
        matches!(self, VoteValue::Points(_))
    }

    /// Numeric value of the card, if any.
    pub fn points(&self) -> Option<u32> {
        match self {
            VoteValue::Points(points) => Some(*points),
            VoteValue::Unknown => None,
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteValue::Points(points) => write!(f, "{points}"),
            VoteValue::Unknown => f.write_str(UNKNOWN_SYMBOL),
        }
    }
}

impl Serialize for VoteValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VoteValue::Points(points) => serializer.serialize_u32(*points),
            VoteValue::Unknown => serializer.serialize_str(UNKNOWN_SYMBOL),
        }
    }
}

/// Accepted input shapes: `5`, `"5"` or `"?"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVote {
    Number(u32),
    Text(String),
}

impl<'de> Deserialize<'de> for VoteValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawVote::deserialize(deserializer)? {
            RawVote::Number(points) => Ok(VoteValue::Points(points)),
            RawVote::Text(text) => {
                let text = text.trim();
                if text == UNKNOWN_SYMBOL {
                    return Ok(VoteValue::Unknown);
                }
                text.parse::<u32>().map(VoteValue::Points).map_err(|_| {
                    de::Error::custom(format!(
                        "vote must be a non-negative integer or \"{UNKNOWN_SYMBOL}\" (got `{text}`)"
                    ))
                })
            }
        }
    }
}

impl PartialSchema for VoteValue {
    fn schema() -> RefOr<Schema> {
        OneOfBuilder::new()
            .item(ObjectBuilder::new().schema_type(Type::Integer))
            .item(
                ObjectBuilder::new()
                    .schema_type(Type::String)
                    .enum_values(Some([UNKNOWN_SYMBOL])),
            )
            .description(Some("Card value: a number of points or \"?\""))
            .into()
    }
}

impl ToSchema for VoteValue {}

/// Cards offered to participants, in display order.
const CARDS: [VoteValue; 12] = [
    VoteValue::Points(0),
    VoteValue::Points(1),
    VoteValue::Points(2),
    VoteValue::Points(3),
    VoteValue::Points(5),
    VoteValue::Points(8),
    VoteValue::Points(13),
    VoteValue::Points(21),
    VoteValue::Points(34),
    VoteValue::Points(55),
    VoteValue::Points(89),
    VoteValue::Unknown,
];

/// Immutable ordered deck of selectable values.
pub struct Deck;

impl Deck {
    /// Every selectable card, numeric values first and the unknown sentinel last.
    pub fn values() -> &'static [VoteValue] {
        &CARDS
    }

    /// Whether `value` is one of the deck's cards.
    pub fn contains(value: &VoteValue) -> bool {
        CARDS.contains(value)
    }

    /// Position of `value` in the deck, used to order tallies deterministically.
    ///
    /// Values outside the deck sort after every card.
    pub fn position(value: &VoteValue) -> usize {
        CARDS
            .iter()
            .position(|card| card == value)
            .unwrap_or(CARDS.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_is_fibonacci_with_unknown_last() {
        let rendered: Vec<String> = Deck::values().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            ["0", "1", "2", "3", "5", "8", "13", "21", "34", "55", "89", "?"]
        );
    }

    #[test]
    fn membership_and_numeric_split() {
        assert!(Deck::contains(&VoteValue::Points(13)));
        assert!(Deck::contains(&VoteValue::Unknown));
        assert!(!Deck::contains(&VoteValue::Points(4)));
        assert!(VoteValue::Points(0).is_numeric());
        assert!(!VoteValue::Unknown.is_numeric());
        assert_eq!(VoteValue::Unknown.points(), None);
    }

    #[test]
    fn wire_format_uses_numbers_and_question_mark() {
        assert_eq!(serde_json::to_string(&VoteValue::Points(8)).unwrap(), "8");
        assert_eq!(serde_json::to_string(&VoteValue::Unknown).unwrap(), "\"?\"");

        let parsed: VoteValue = serde_json::from_str("\"?\"").unwrap();
        assert_eq!(parsed, VoteValue::Unknown);
        let parsed: VoteValue = serde_json::from_str("\"21\"").unwrap();
        assert_eq!(parsed, VoteValue::Points(21));
    }

    #[test]
    fn rejects_negative_and_garbage_values() {
        assert!(serde_json::from_str::<VoteValue>("-1").is_err());
        assert!(serde_json::from_str::<VoteValue>("\"coffee\"").is_err());
        assert!(serde_json::from_str::<VoteValue>("null").is_err());
    }

    #[test]
    fn off_deck_values_sort_last() {
        assert_eq!(Deck::position(&VoteValue::Points(0)), 0);
        assert_eq!(Deck::position(&VoteValue::Unknown), 11);
        assert_eq!(Deck::position(&VoteValue::Points(4)), 12);
    }
}
