//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::RoomRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    /// Build the state and start the default room. Must run inside the runtime.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let rooms = Arc::new(RoomRegistry::start(config.rooms.clone()));

        Self { config, rooms }
    }
}
