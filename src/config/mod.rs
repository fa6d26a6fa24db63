//! Configuration module - environment variable parsing

use std::collections::BTreeMap;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::time::DEFAULT_FRAMERATE;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines (`LOG_FORMAT=json`)
    pub log_json: bool,
    /// Allowed client origins for CORS (comma-separated), permissive when unset
    pub client_origin: Option<String>,
    /// Directory served as static files for the browser client
    pub static_dir: Option<PathBuf>,
    /// Settings shared by every room
    pub rooms: RoomConfig,
}

/// Per-room settings, passed explicitly into every room at construction
#[derive(Clone, Debug)]
pub struct RoomConfig {
    /// Maximum number of rooms alive at once (default room included)
    pub max_rooms: usize,
    /// Maximum sessions admitted into one room
    pub max_room_members: usize,
    /// Simulation ticks per second
    pub framerate: f64,
    /// Field width in world units
    pub field_width: f64,
    /// Field height in world units
    pub field_height: f64,
    /// Collectibles seeded synchronously when a room is created
    pub initial_stuffs: usize,
    /// Traps seeded when a room is created
    pub initial_traps: usize,
    /// Spawner stops once collectibles exceed `base + per_session * sessions`
    pub stuff_ceiling_base: usize,
    pub stuff_ceiling_per_session: usize,
    /// Spawner delay at the initial population with one session
    pub spawn_base_delay_ms: u64,
    /// Collectible type table keyed by type code
    pub stuff_types: StuffTypeTable,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_rooms: 50,
            max_room_members: 64,
            framerate: DEFAULT_FRAMERATE,
            field_width: 8192.0,
            field_height: 8192.0,
            initial_stuffs: 50,
            initial_traps: 10,
            stuff_ceiling_base: 100,
            stuff_ceiling_per_session: 25,
            spawn_base_delay_ms: 500,
            stuff_types: StuffTypeTable::default(),
        }
    }
}

/// Attributes of one collectible type
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StuffType {
    pub health: f64,
    pub experience: u32,
    pub body_damage: f64,
}

/// Static collectible type table (type code -> attributes)
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StuffTypeTable {
    types: BTreeMap<u32, StuffType>,
}

impl StuffTypeTable {
    /// Parse a table from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_json::from_str(json).map_err(ConfigError::StuffTable)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.types.is_empty() {
            return Err(ConfigError::Invalid("STUFF_TYPES_PATH"));
        }
        Ok(())
    }

    pub fn get(&self, code: u32) -> Option<&StuffType> {
        self.types.get(&code)
    }

    /// All configured type codes in ascending order
    pub fn codes(&self) -> Vec<u32> {
        self.types.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for StuffTypeTable {
    fn default() -> Self {
        let types = [
            (1, 10.0, 10, 1.0),
            (2, 30.0, 25, 2.0),
            (3, 100.0, 130, 4.0),
            (4, 400.0, 500, 8.0),
        ]
        .into_iter()
        .map(|(code, health, experience, body_damage)| {
            (
                code,
                StuffType {
                    health,
                    experience,
                    body_damage,
                },
            )
        })
        .collect();
        Self { types }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let defaults = RoomConfig::default();
        let stuff_types = match env::var("STUFF_TYPES_PATH") {
            Ok(path) => StuffTypeTable::load(Path::new(&path))?,
            Err(_) => StuffTypeTable::default(),
        };

        let rooms = RoomConfig {
            max_rooms: env_or("MAX_ROOMS", defaults.max_rooms)?,
            max_room_members: env_or("MAX_ROOM_MEMBERS", defaults.max_room_members)?,
            framerate: env_or("ROOM_FRAMERATE", defaults.framerate)?,
            field_width: env_or("FIELD_WIDTH", defaults.field_width)?,
            field_height: env_or("FIELD_HEIGHT", defaults.field_height)?,
            initial_stuffs: env_or("INITIAL_STUFFS", defaults.initial_stuffs)?,
            initial_traps: env_or("INITIAL_TRAPS", defaults.initial_traps)?,
            stuff_types,
            ..defaults
        };
        rooms.validate()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")),
            client_origin: env::var("CLIENT_ORIGIN").ok(),
            static_dir: env::var("STATIC_DIR").ok().map(PathBuf::from),
            rooms,
        })
    }
}

impl RoomConfig {
    /// Reject settings the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.framerate.is_finite() && self.framerate > 0.0) {
            return Err(ConfigError::Invalid("ROOM_FRAMERATE"));
        }
        if !(self.field_width > 0.0) {
            return Err(ConfigError::Invalid("FIELD_WIDTH"));
        }
        if !(self.field_height > 0.0) {
            return Err(ConfigError::Invalid("FIELD_HEIGHT"));
        }
        if self.max_rooms == 0 {
            return Err(ConfigError::Invalid("MAX_ROOMS"));
        }
        if self.max_room_members == 0 {
            return Err(ConfigError::Invalid("MAX_ROOM_MEMBERS"));
        }
        self.stuff_types.validate()
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed collectible type table: {0}")]
    StuffTable(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuff_table_from_json() {
        let table = StuffTypeTable::from_json(
            r#"{"1": {"health": 10, "experience": 7, "bodyDamage": 1.5},
                "2": {"health": 20, "experience": 9, "bodyDamage": 2}}"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.codes(), vec![1, 2]);
        let first = table.get(1).unwrap();
        assert_eq!(first.health, 10.0);
        assert_eq!(first.experience, 7);
        assert_eq!(first.body_damage, 1.5);
    }

    #[test]
    fn test_empty_stuff_table_is_rejected() {
        assert!(matches!(
            StuffTypeTable::from_json("{}"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_stuff_table_is_rejected() {
        assert!(matches!(
            StuffTypeTable::from_json(r#"{"1": {"health": "lots"}}"#),
            Err(ConfigError::StuffTable(_))
        ));
    }

    #[test]
    fn test_room_config_validation() {
        assert!(RoomConfig::default().validate().is_ok());

        let config = RoomConfig {
            framerate: 0.0,
            ..RoomConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("ROOM_FRAMERATE"))
        ));

        let config = RoomConfig {
            max_rooms: 0,
            ..RoomConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid("MAX_ROOMS"))));
    }
}
