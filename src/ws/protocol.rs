//! WebSocket protocol message definitions
//! Every frame is a `{ "method": ..., "params": {...} }` envelope

use serde::{Deserialize, Serialize};

use crate::game::entity::Stat;
use crate::game::physics::Direction;
use crate::game::room::PlayerCommand;
use crate::game::snapshot::PlayerView;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Hold or release a movement key
    MoveUp { value: bool },
    MoveDown { value: bool },
    MoveLeft { value: bool },
    MoveRight { value: bool },

    /// Fire `number` bullets along `(x, y)`
    Shoot { x: f64, y: f64, number: u32 },

    /// Upgrade one stat by name
    Evaluation {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl ClientMsg {
    /// Decode one text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The room command this message asks for. Unknown stat names give `None`.
    pub fn into_command(self) -> Option<PlayerCommand> {
        let command = match self {
            ClientMsg::MoveUp { value } => PlayerCommand::Move {
                direction: Direction::Up,
                held: value,
            },
            ClientMsg::MoveDown { value } => PlayerCommand::Move {
                direction: Direction::Down,
                held: value,
            },
            ClientMsg::MoveLeft { value } => PlayerCommand::Move {
                direction: Direction::Left,
                held: value,
            },
            ClientMsg::MoveRight { value } => PlayerCommand::Move {
                direction: Direction::Right,
                held: value,
            },
            ClientMsg::Shoot { x, y, number } => PlayerCommand::Shoot { x, y, number },
            ClientMsg::Evaluation { kind } => PlayerCommand::Evaluate(Stat::from_wire(&kind)?),
        };
        Some(command)
    }
}

/// Bare envelope, used to tell unknown methods from garbage
#[derive(Debug, Deserialize)]
struct Envelope {
    method: String,
}

/// True when the frame is a `{method, ...}` object, whatever the method
pub fn is_envelope(text: &str) -> bool {
    serde_json::from_str::<Envelope>(text)
        .map(|envelope| !envelope.method.is_empty())
        .unwrap_or(false)
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Culled world view, once per tick
    PlayerSession(PlayerView),

    /// Liveness probe; any inbound command answers it
    Ping {},

    /// The avatar died; the session ends after this
    PlayerDead {},

    /// Shoot request refused
    Shoot { message: String },

    /// Admission failure
    Error { code: String, message: String },
}

impl ServerMsg {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Encode as a text frame
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_move_commands() {
        let msg = ClientMsg::parse(r#"{"method":"moveLeft","params":{"value":true}}"#).unwrap();
        assert_eq!(msg, ClientMsg::MoveLeft { value: true });
        assert_eq!(
            msg.into_command(),
            Some(PlayerCommand::Move {
                direction: Direction::Left,
                held: true
            })
        );
    }

    #[test]
    fn test_parse_shoot_and_evaluation() {
        let shoot = ClientMsg::parse(r#"{"method":"shoot","params":{"x":0.5,"y":-1,"number":3}}"#).unwrap();
        assert_eq!(
            shoot,
            ClientMsg::Shoot {
                x: 0.5,
                y: -1.0,
                number: 3
            }
        );

        let evaluation = ClientMsg::parse(r#"{"method":"evaluation","params":{"type":"BulletReload"}}"#).unwrap();
        assert_eq!(
            evaluation.into_command(),
            Some(PlayerCommand::Evaluate(Stat::BulletReload))
        );
    }

    #[test]
    fn test_unknown_stat_has_no_command() {
        let msg = ClientMsg::parse(r#"{"method":"evaluation","params":{"type":"Charisma"}}"#).unwrap();
        assert_eq!(msg.into_command(), None);
    }

    #[test]
    fn test_malformed_frames_fail_to_parse() {
        for frame in [
            "not json",
            r#"{"method":"teleport","params":{}}"#,
            r#"{"method":"moveUp","params":{"value":"yes"}}"#,
            r#"{"method":"shoot","params":{"x":1,"y":1,"number":-2}}"#,
            r#"{"params":{"value":true}}"#,
        ] {
            assert!(ClientMsg::parse(frame).is_err(), "{frame}");
        }
    }

    #[test]
    fn test_unknown_method_is_still_an_envelope() {
        assert!(is_envelope(r#"{"method":"pong","params":{}}"#));
        assert!(!is_envelope(r#"{"params":{}}"#));
        assert!(!is_envelope("[1, 2]"));
        assert!(!is_envelope("garbage"));
    }

    #[test]
    fn test_server_envelopes() {
        assert_eq!(
            serde_json::to_value(ServerMsg::Ping {}).unwrap(),
            json!({"method": "ping", "params": {}})
        );
        assert_eq!(
            serde_json::to_value(ServerMsg::PlayerDead {}).unwrap(),
            json!({"method": "playerDead", "params": {}})
        );
        assert_eq!(
            serde_json::to_value(ServerMsg::error("room_full", "Room is full")).unwrap(),
            json!({"method": "error", "params": {"code": "room_full", "message": "Room is full"}})
        );
        let text = ServerMsg::Shoot {
            message: "reloading".to_string(),
        }
        .to_text()
        .unwrap();
        assert_eq!(text, r#"{"method":"shoot","params":{"message":"reloading"}}"#);
    }
}
