use tokio::sync::Mutex;

use waypoint_core::config::GatewayConfig;
use waypoint_engine::Engine;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    /// Graph and run tables. Runs execute while the lock is held.
    pub engine: Mutex<Engine>,
}

impl AppState {
    pub fn new(config: GatewayConfig, engine: Engine) -> Self {
        Self {
            config,
            engine: Mutex::new(engine),
        }
    }
}
