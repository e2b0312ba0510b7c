use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{deck::VoteValue, room_id::RoomId};

/// Response returned once a room has been created.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    /// Identifier participants use to join.
    pub room_id: RoomId,
    /// Link that prefills the join screen with the room id.
    pub share_url: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

/// The selectable cards, in display order.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeckResponse {
    /// Numeric cards followed by `"?"`.
    pub values: Vec<VoteValue>,
}
