//! Per-connection session: admission, then inbound, outbound and heartbeat tasks
//!
//! The session only sees a `Sink` of outbound messages and a `Stream` of inbound
//! text frames, so it runs the same over a WebSocket or an in-memory channel.

use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::game::{JoinError, RoomHandle, WorldFrame};
use crate::util::rate_limit::InputThrottle;
use crate::util::time::tick_duration;
use crate::ws::protocol::{is_envelope, ClientMsg, ServerMsg};

/// How often a ping goes out
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
/// How long the client has to send anything after a ping
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(1);

const DIRECT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Active,
    Disconnected,
}

/// Why an active session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    TransportClosed,
    HeartbeatTimeout,
    Died,
    SendFailed,
    RoomClosed,
    TaskFailed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Join rejected: {0}")]
    Join(#[from] JoinError),
}

impl From<axum::Error> for SessionError {
    fn from(err: axum::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}

/// One player's connection to one room
pub struct Session {
    name: String,
    room: RoomHandle,
    phase: SessionPhase,
    avatar_id: Option<Uuid>,
}

impl Session {
    pub fn new(name: String, room: RoomHandle) -> Self {
        Self {
            name,
            room,
            phase: SessionPhase::Connecting,
            avatar_id: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn avatar_id(&self) -> Option<Uuid> {
        self.avatar_id
    }

    /// Join the room and drive the session until it disconnects
    pub async fn run<S, R>(&mut self, mut sink: S, stream: R) -> Result<EndReason, SessionError>
    where
        S: Sink<ServerMsg, Error = SessionError> + Unpin + Send + 'static,
        R: Stream<Item = String> + Unpin + Send + 'static,
    {
        let (direct_tx, direct_rx) = mpsc::channel(DIRECT_BUFFER);

        let admission = match self.room.join(self.name.clone(), direct_tx.clone()).await {
            Ok(admission) => admission,
            Err(err) => {
                self.phase = SessionPhase::Disconnected;
                let _ = sink.send(ServerMsg::error(err.code(), err.to_string())).await;
                let _ = sink.close().await;
                return Err(err.into());
            }
        };
        let avatar_id = admission.avatar_id;
        self.avatar_id = Some(avatar_id);
        self.phase = SessionPhase::Active;
        info!(room = %admission.room, player = %self.name, avatar_id = %avatar_id, "Session active");

        let signal = Arc::new(Notify::new());

        let mut inbound = tokio::spawn(inbound(
            stream,
            self.room.clone(),
            avatar_id,
            signal.clone(),
            InputThrottle::default(),
        ));
        let mut outbound = tokio::spawn(outbound(
            sink,
            self.room.frames(),
            direct_rx,
            avatar_id,
            tick_duration(self.room.framerate),
        ));
        let mut heartbeat = tokio::spawn(heartbeat(direct_tx, signal, HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT));

        let finished = tokio::select! {
            result = &mut inbound => result,
            result = &mut outbound => result,
            result = &mut heartbeat => result,
        };
        let reason = finished.unwrap_or_else(|err| {
            error!(avatar_id = %avatar_id, error = %err, "Session task failed");
            EndReason::TaskFailed
        });

        self.phase = SessionPhase::Disconnected;
        abort_all([&inbound, &outbound, &heartbeat]);
        self.room.leave(avatar_id).await;

        info!(
            room = %admission.room,
            player = %self.name,
            avatar_id = %avatar_id,
            reason = ?reason,
            "Session disconnected"
        );
        Ok(reason)
    }
}

fn abort_all(tasks: [&JoinHandle<EndReason>; 3]) {
    for task in tasks {
        task.abort();
    }
}

/// Decode client frames into room commands
async fn inbound<R>(
    mut stream: R,
    room: RoomHandle,
    avatar_id: Uuid,
    signal: Arc<Notify>,
    mut throttle: InputThrottle,
) -> EndReason
where
    R: Stream<Item = String> + Unpin,
{
    while let Some(text) = stream.next().await {
        if let Err(streak) = throttle.admit() {
            if streak == 1 {
                warn!(avatar_id = %avatar_id, "Rate limited input message");
            }
            continue;
        }

        let msg = match ClientMsg::parse(&text) {
            Ok(msg) => msg,
            Err(e) if is_envelope(&text) => {
                signal.notify_waiters();
                debug!(avatar_id = %avatar_id, error = %e, "Ignoring unsupported command");
                continue;
            }
            Err(e) => {
                warn!(avatar_id = %avatar_id, error = %e, "Failed to parse client message");
                continue;
            }
        };
        signal.notify_waiters();

        let Some(command) = msg.into_command() else {
            debug!(avatar_id = %avatar_id, "Ignoring unknown stat");
            continue;
        };
        if !room.input(avatar_id, command).await {
            return EndReason::RoomClosed;
        }
    }
    EndReason::TransportClosed
}

/// Stream the culled view every tick and forward direct notifications
async fn outbound<S>(
    mut sink: S,
    frames: watch::Receiver<Arc<WorldFrame>>,
    mut direct: mpsc::Receiver<ServerMsg>,
    avatar_id: Uuid,
    period: Duration,
) -> EndReason
where
    S: Sink<ServerMsg, Error = SessionError> + Unpin,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let view = frames.borrow().view_for(avatar_id);
                let Some(view) = view else {
                    continue;
                };
                if let Err(e) = sink.send(ServerMsg::PlayerSession(view)).await {
                    debug!(avatar_id = %avatar_id, error = %e, "Send failed");
                    return EndReason::SendFailed;
                }
            }
            msg = direct.recv() => {
                let Some(msg) = msg else {
                    return EndReason::RoomClosed;
                };
                let died = matches!(msg, ServerMsg::PlayerDead {});
                if let Err(e) = sink.send(msg).await {
                    debug!(avatar_id = %avatar_id, error = %e, "Send failed");
                    return EndReason::SendFailed;
                }
                if died {
                    let _ = sink.close().await;
                    return EndReason::Died;
                }
            }
        }
    }
}

/// Ping every `period` and expect some inbound command within `window`.
/// Only input that arrives after a ping answers it.
async fn heartbeat(direct: mpsc::Sender<ServerMsg>, signal: Arc<Notify>, period: Duration, window: Duration) -> EndReason {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let answered = signal.notified();
        tokio::pin!(answered);
        answered.as_mut().enable();

        if direct.send(ServerMsg::Ping {}).await.is_err() {
            return EndReason::RoomClosed;
        }
        if timeout(window, answered).await.is_err() {
            return EndReason::HeartbeatTimeout;
        }
    }
}
