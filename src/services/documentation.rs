use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Planning Poker Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::get_deck,
        crate::routes::sse::room_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomResponse,
            crate::dto::room::DeckResponse,
            crate::dto::snapshot::StateUpdate,
            crate::dto::snapshot::ParticipantView,
            crate::dto::snapshot::StatisticsView,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::ErrorMessage,
            crate::state::deck::VoteValue,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room creation and lookup"),
        (name = "sse", description = "Server-sent observer streams"),
        (name = "participants", description = "WebSocket protocol for participants"),
    )
)]
pub struct ApiDoc;
