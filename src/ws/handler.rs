//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{future, SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::game::RoomHandle;
use crate::http::AppError;
use crate::ws::protocol::ServerMsg;
use crate::ws::session::{Session, SessionError};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Player name, unique within the room
    #[serde(default)]
    pub name: String,
    /// Room to join; the default room when absent
    pub room: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let name = query.name.trim().to_string();
    if name.is_empty() {
        warn!("WebSocket upgrade without a player name");
        return Err(AppError::BadRequest("Player name must not be empty".to_string()));
    }

    let room = state.rooms.select(query.room.as_deref());
    info!(player = %name, room = %room.name, "WebSocket upgrade");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, name, room)))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, name: String, room: RoomHandle) {
    let (ws_sink, ws_stream) = socket.split();

    // Text frames only; the stream ends at the first close frame or error
    let stream = ws_stream
        .take_while(|frame| future::ready(matches!(frame, Ok(msg) if !matches!(msg, Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(text),
                Ok(other) => {
                    debug!(frame = ?other, "Ignoring non-text frame");
                    None
                }
                Err(_) => None,
            })
        });

    let sink = ws_sink
        .sink_map_err(SessionError::from)
        .with(|msg: ServerMsg| future::ready(msg.to_text().map(Message::Text).map_err(SessionError::from)));

    let mut session = Session::new(name.clone(), room);
    match session.run(Box::pin(sink), Box::pin(stream)).await {
        Ok(reason) => debug!(
            player = %name,
            avatar_id = ?session.avatar_id(),
            phase = ?session.phase(),
            reason = ?reason,
            "WebSocket connection closed"
        ),
        Err(e) => warn!(player = %name, error = %e, "WebSocket session refused"),
    }
}
