//! Library crate for planning-poker-back, exposing modules for binaries and integration tests.

/// Runtime configuration.
pub mod config;
/// Wire types for REST, WebSocket and SSE payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Room authority, transports and background supervisors.
pub mod services;
/// Rooms, participants, registry and snapshot fan-out.
pub mod state;
