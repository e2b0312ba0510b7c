use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::{
        room::{CreateRoomResponse, DeckResponse},
        snapshot::StateUpdate,
    },
    error::AppError,
    services::room_service,
    state::SharedState,
};

#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    responses(
        (status = 201, description = "Room created", body = CreateRoomResponse),
        (status = 409, description = "No free room id could be allocated")
    )
)]
/// Create an empty room and return its shareable link.
pub async fn create_room(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<CreateRoomResponse>), AppError> {
    let created = room_service::create_room(&state)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/rooms/{room_id}",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room code, case-insensitive for short codes")),
    responses(
        (status = 200, description = "Observer view of the room", body = StateUpdate),
        (status = 400, description = "Malformed room id"),
        (status = 404, description = "Room not found")
    )
)]
/// Return the room as seen by an anonymous observer; hidden votes are never included.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Json<StateUpdate>, AppError> {
    let room_id = room_service::parse_room_id(&state, &room_id)?;
    let snapshot = room_service::room_snapshot(&state, &room_id).await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    get,
    path = "/deck",
    tag = "rooms",
    responses((status = 200, description = "Selectable cards", body = DeckResponse))
)]
/// List the deck's cards in display order.
pub async fn get_deck() -> Json<DeckResponse> {
    Json(room_service::deck())
}

/// Configure the room endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{room_id}", get(get_room))
        .route("/deck", get(get_deck))
}
