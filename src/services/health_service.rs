use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report room and connection counts, flagging a draining server.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.registry().len();
    let participants = state.presence().len();
    debug!(rooms, participants, "health check");

    if state.is_shutting_down() {
        HealthResponse::shutting_down(rooms, participants)
    } else {
        HealthResponse::ok(rooms, participants)
    }
}
