//! Time utilities for the simulation

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Reference room framerate (ticks per second)
pub const DEFAULT_FRAMERATE: f64 = 50.0;

/// Length of one tick in milliseconds for the given framerate
pub fn tick_millis(framerate: f64) -> f64 {
    1000.0 / framerate
}

/// Length of one tick as a `Duration`
pub fn tick_duration(framerate: f64) -> Duration {
    Duration::from_micros((1_000_000.0 / framerate).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration_reference_rate() {
        assert_eq!(tick_duration(DEFAULT_FRAMERATE), Duration::from_millis(20));
        assert_eq!(tick_millis(DEFAULT_FRAMERATE), 20.0);
    }

    #[test]
    fn test_uptime_after_init() {
        init_server_time();
        assert!(uptime_secs() < 5);
    }
}
