use serde::Serialize;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE streams.
pub struct ServerEvent {
    /// SSE event name.
    pub event: Option<String>,
    /// JSON-encoded event data.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}
