use crate::broadcast::BroadcastMode;
use shared::{INITIAL_PICKUP_COUNT, PICKUP_RESPAWN_MS, TICK_RATE};
use std::time::Duration;

/// Runtime settings for one server instance
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Snapshot broadcasts per second in fixed-tick mode
    pub tick_rate: u32,
    pub initial_pickups: usize,
    pub respawn_delay: Duration,
    pub broadcast_mode: BroadcastMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            tick_rate: TICK_RATE,
            initial_pickups: INITIAL_PICKUP_COUNT,
            respawn_delay: Duration::from_millis(PICKUP_RESPAWN_MS),
            broadcast_mode: BroadcastMode::FixedTick,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Period between ticks; a zero tick rate is treated as 1 Hz
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}
