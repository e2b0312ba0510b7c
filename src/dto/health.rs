use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "shutting_down").
    pub status: String,
    /// Number of rooms currently held by this authority.
    pub rooms: usize,
    /// Number of joined participant connections.
    pub participants: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(rooms: usize, participants: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
            participants,
        }
    }

    /// Create a health response indicating the server is draining connections.
    pub fn shutting_down(rooms: usize, participants: usize) -> Self {
        Self {
            status: "shutting_down".to_string(),
            rooms,
            participants,
        }
    }
}
