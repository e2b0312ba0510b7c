use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{snapshot::StateUpdate, validation::validate_display_name},
    state::{deck::VoteValue, room_id::RoomId},
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from participant WebSocket clients.
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Register in the room; must be the first message on a connection.
    Join(JoinRequest),
    /// Record the caller's vote.
    Vote(VoteRequest),
    /// Reveal every vote.
    Reveal,
    /// Clear every vote and start a new round.
    Reset,
    /// Leave the room (page unload).
    Leave,
    #[serde(other)]
    /// Any unrecognised message type.
    Unknown,
}

/// Why an inbound frame could not be turned into a [`ClientMessage`].
#[derive(Debug, Error)]
pub enum ClientMessageError {
    /// Not JSON, or not a known message shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed but carrying invalid fields.
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse a text frame and validate its payload.
    pub fn from_json_str(text: &str) -> Result<Self, ClientMessageError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        if let ClientMessage::Join(join) = &message {
            join.validate()?;
        }
        Ok(message)
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Payload of a `join` message.
pub struct JoinRequest {
    /// Display name shown to the other participants.
    pub name: String,
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_display_name(&self.name) {
            errors.add("name", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Payload of a `vote` message.
pub struct VoteRequest {
    /// Chosen card: a number of points or `"?"`.
    pub value: VoteValue,
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed from the hub to participant WebSocket clients.
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Acknowledges a successful join.
    Joined(JoinedMessage),
    /// Canonical room snapshot rendered for the receiving participant.
    StateUpdate(StateUpdate),
    /// Rejected join or invalid input.
    Error(ErrorMessage),
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Sent once after the hub registered the participant.
pub struct JoinedMessage {
    /// Normalized identifier of the joined room.
    pub room_id: RoomId,
    /// Identifier the hub issued to this connection.
    pub participant_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Explains why a message was rejected.
pub struct ErrorMessage {
    /// Stable machine-readable code (`room_not_found`, `invalid_input`, ...).
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_client_vocabulary() {
        let join = ClientMessage::from_json_str(r#"{"type":"join","name":"Ada"}"#).unwrap();
        assert!(matches!(join, ClientMessage::Join(JoinRequest { name }) if name == "Ada"));

        let vote = ClientMessage::from_json_str(r#"{"type":"vote","value":"?"}"#).unwrap();
        assert!(matches!(
            vote,
            ClientMessage::Vote(VoteRequest {
                value: VoteValue::Unknown
            })
        ));

        for (raw, expected) in [
            (r#"{"type":"reveal"}"#, "reveal"),
            (r#"{"type":"reset"}"#, "reset"),
            (r#"{"type":"leave"}"#, "leave"),
            (r#"{"type":"shuffle"}"#, "unknown"),
        ] {
            let parsed = ClientMessage::from_json_str(raw).unwrap();
            let name = match parsed {
                ClientMessage::Reveal => "reveal",
                ClientMessage::Reset => "reset",
                ClientMessage::Leave => "leave",
                ClientMessage::Unknown => "unknown",
                _ => "other",
            };
            assert_eq!(name, expected);
        }
    }

    #[test]
    fn rejects_blank_names_and_bad_votes() {
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"type":"join","name":"  "}"#),
            Err(ClientMessageError::Invalid(_))
        ));
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"type":"vote","value":-3}"#),
            Err(ClientMessageError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::from_json_str("not json"),
            Err(ClientMessageError::Malformed(_))
        ));
    }

    #[test]
    fn server_messages_are_type_tagged() {
        let message = ServerMessage::Error(ErrorMessage {
            code: "room_not_found".into(),
            message: "not found: room `ABCDEF`".into(),
        });
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "room_not_found");
    }
}
