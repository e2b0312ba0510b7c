//! Application-level configuration loading: room id scheme, retention and connection timing.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::room_id::{RoomId, RoomIdScheme};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PLANNING_POKER_CONFIG_PATH";

const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080/";
const DEFAULT_EMPTY_ROOM_GRACE: Duration = Duration::from_secs(300);
const DEFAULT_EVICTION_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(45);
const DEFAULT_ROOM_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// How room ids are generated and compared.
    pub room_id_scheme: RoomIdScheme,
    /// Create unknown rooms on first join instead of rejecting the join.
    pub auto_create_rooms: bool,
    /// Reject votes that are not one of the deck's cards.
    pub strict_votes: bool,
    /// Base address used to build shareable room links.
    pub public_base_url: String,
    /// How long a room may stay empty before it is evicted.
    pub empty_room_grace: Duration,
    /// How often the eviction supervisor sweeps the registry.
    pub eviction_sweep_interval: Duration,
    /// How long a fresh connection may take to send its `join`.
    pub join_timeout: Duration,
    /// Interval between server pings on participant sockets.
    pub heartbeat_interval: Duration,
    /// Silence after which a participant socket is considered gone.
    pub heartbeat_timeout: Duration,
    /// Per-room snapshot buffer for each attached listener.
    pub room_channel_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        scheme = ?app_config.room_id_scheme,
                        grace_secs = app_config.empty_room_grace.as_secs(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Shareable link that lets the join screen prefill `room_id`.
    pub fn share_url(&self, room_id: &RoomId) -> String {
        let separator = if self.public_base_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!("{}{separator}room={room_id}", self.public_base_url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            room_id_scheme: RoomIdScheme::default(),
            auto_create_rooms: false,
            strict_votes: true,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            empty_room_grace: DEFAULT_EMPTY_ROOM_GRACE,
            eviction_sweep_interval: DEFAULT_EVICTION_SWEEP_INTERVAL,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            room_channel_capacity: DEFAULT_ROOM_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every field is optional; missing ones keep their default.
struct RawConfig {
    room_id_scheme: Option<RoomIdScheme>,
    auto_create_rooms: Option<bool>,
    strict_votes: Option<bool>,
    public_base_url: Option<String>,
    empty_room_grace_secs: Option<u64>,
    eviction_sweep_interval_secs: Option<u64>,
    join_timeout_secs: Option<u64>,
    heartbeat_interval_secs: Option<u64>,
    heartbeat_timeout_secs: Option<u64>,
    room_channel_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let secs = |raw: Option<u64>, fallback: Duration| {
            raw.map(Duration::from_secs).unwrap_or(fallback)
        };

        let heartbeat_interval = secs(value.heartbeat_interval_secs, defaults.heartbeat_interval)
            .max(Duration::from_secs(1));
        let heartbeat_timeout =
            secs(value.heartbeat_timeout_secs, defaults.heartbeat_timeout).max(heartbeat_interval);

        Self {
            room_id_scheme: value.room_id_scheme.unwrap_or(defaults.room_id_scheme),
            auto_create_rooms: value.auto_create_rooms.unwrap_or(defaults.auto_create_rooms),
            strict_votes: value.strict_votes.unwrap_or(defaults.strict_votes),
            public_base_url: value
                .public_base_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.public_base_url),
            empty_room_grace: secs(value.empty_room_grace_secs, defaults.empty_room_grace),
            eviction_sweep_interval: secs(
                value.eviction_sweep_interval_secs,
                defaults.eviction_sweep_interval,
            )
            .max(Duration::from_secs(1)),
            join_timeout: secs(value.join_timeout_secs, defaults.join_timeout),
            heartbeat_interval,
            heartbeat_timeout,
            room_channel_capacity: value
                .room_channel_capacity
                .unwrap_or(defaults.room_channel_capacity)
                .max(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
