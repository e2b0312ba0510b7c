pub mod channel;
pub mod deck;
pub mod participant;
pub mod presence;
pub mod registry;
pub mod room;
pub mod room_id;
pub mod stats;

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::AppConfig;

pub use self::channel::{HubChannel, SyncChannel};
pub use self::presence::PresenceMonitor;
pub use self::registry::{RoomHandle, RoomRegistry};

/// Reason sent to every open connection when the authority shuts down.
pub const SHUTDOWN_REASON: &str = "server shutting down";

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: the room registry plus the channel that fans snapshots out.
///
/// This process is the single authority for every room it holds.
pub struct AppState {
    config: Arc<AppConfig>,
    registry: RoomRegistry,
    channel: Arc<dyn SyncChannel>,
    presence: PresenceMonitor,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Snapshots are fanned out through an in-process [`HubChannel`].
    pub fn new(config: AppConfig) -> SharedState {
        let channel = Arc::new(HubChannel::new(config.room_channel_capacity));
        Self::with_channel(config, channel)
    }

    /// Construct the state around a specific [`SyncChannel`] realization.
    pub fn with_channel(config: AppConfig, channel: Arc<dyn SyncChannel>) -> SharedState {
        let (shutdown_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            config: Arc::new(config),
            registry: RoomRegistry::new(),
            channel,
            presence: PresenceMonitor::new(),
            shutdown: shutdown_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Registry of active rooms keyed by their identifier.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Channel delivering snapshots to attached participants.
    pub fn channel(&self) -> &dyn SyncChannel {
        self.channel.as_ref()
    }

    /// Which room each joined connection belongs to.
    pub fn presence(&self) -> &PresenceMonitor {
        &self.presence
    }

    /// Signal every open connection that the authority is going away.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether [`AppState::begin_shutdown`] was called.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Subscribe to the shutdown flag.
    pub fn shutdown_watcher(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}
