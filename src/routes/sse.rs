use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::{room_service, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/rooms/{room_id}/events",
    tag = "sse",
    params(("room_id" = String, Path, description = "Room to observe")),
    responses(
        (status = 200, description = "Observer stream of `stateUpdate` events", content_type = "text/event-stream", body = String),
        (status = 404, description = "Room not found")
    )
)]
/// Stream the room's snapshots, rendered without hidden votes, to wallboards and observers.
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let room_id = room_service::parse_room_id(&state, &room_id)?;
    let subscription = sse_service::subscribe_room(&state, &room_id).await?;
    info!(room_id = %room_id, "new observer SSE connection");
    Ok(sse_service::to_sse_stream(
        subscription,
        state.shutdown_watcher(),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{room_id}/events", get(room_stream))
}
