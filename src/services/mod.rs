/// OpenAPI documentation generation.
pub mod documentation;
/// Background eviction of idle rooms.
pub mod eviction;
/// Health check service.
pub mod health_service;
/// Room authority: joins, transitions and lookups.
pub mod room_service;
/// Server-Sent Events observer streams.
pub mod sse_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
