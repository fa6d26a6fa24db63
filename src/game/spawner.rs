//! Load-adaptive collectible replenishment

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::RoomConfig;

use super::factory;
use super::room::RoomHandle;

/// Collectible count above which the spawner stops for good
pub fn ceiling(config: &RoomConfig, sessions: usize) -> usize {
    config.stuff_ceiling_base + config.stuff_ceiling_per_session * sessions
}

/// Wait before the next spawn. Grows quadratically with the population and
/// shrinks with the number of players.
pub fn spawn_delay(config: &RoomConfig, stuffs: usize, sessions: usize) -> Duration {
    let fill = stuffs as f64 / config.initial_stuffs.max(1) as f64;
    let millis = config.spawn_base_delay_ms as f64 * (1.0 + fill * fill) / sessions.max(1) as f64;
    Duration::from_secs_f64(millis / 1000.0)
}

/// Spawner task of one room
pub async fn run(room: RoomHandle, config: RoomConfig, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    loop {
        let stuffs = room.stuff_count();
        let sessions = room.session_count();
        let limit = ceiling(&config, sessions);
        if stuffs > limit {
            info!(room = %room.name, stuffs, limit, "Collectible ceiling reached, spawner stopped");
            return;
        }

        tokio::time::sleep(spawn_delay(&config, stuffs, sessions)).await;

        let Some(stuff) = factory::spawn_stuff(&config.stuff_types, &room.field, &mut rng) else {
            warn!(room = %room.name, "Collectible type table is empty, spawner stopped");
            return;
        };
        debug!(room = %room.name, stuff_id = %stuff.id(), kind = stuff.kind, "Spawning collectible");
        if !room.spawn_stuff(stuff).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::room::GameRoom;

    fn config() -> RoomConfig {
        RoomConfig {
            initial_stuffs: 2,
            initial_traps: 0,
            stuff_ceiling_base: 3,
            stuff_ceiling_per_session: 25,
            spawn_base_delay_ms: 500,
            ..RoomConfig::default()
        }
    }

    #[test]
    fn test_ceiling_grows_with_sessions() {
        let c = RoomConfig::default();
        assert_eq!(ceiling(&c, 0), 100);
        assert_eq!(ceiling(&c, 4), 200);
    }

    #[test]
    fn test_delay_formula() {
        let c = RoomConfig::default();
        assert_eq!(spawn_delay(&c, 0, 0), Duration::from_millis(500));
        assert_eq!(spawn_delay(&c, 50, 1), Duration::from_millis(1000));
        assert_eq!(spawn_delay(&c, 100, 2), Duration::from_millis(1250));
    }

    #[test]
    fn test_delay_with_no_initial_population() {
        let c = RoomConfig {
            initial_stuffs: 0,
            ..RoomConfig::default()
        };
        assert_eq!(spawn_delay(&c, 1, 1), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawner_stops_past_ceiling() {
        let config = config();
        let (room, handle) = GameRoom::new("spawn", &config, 3);
        tokio::spawn(room.run());

        let spawner = tokio::spawn(run(handle.clone(), config, 4));
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(spawner.is_finished());
        assert_eq!(handle.stuff_count(), 4);
        assert_eq!(handle.frames().borrow().stuffs.len(), 4);
    }
}
