//! Room actor, its handle and the room registry

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RoomConfig;
use crate::util::time::tick_duration;
use crate::ws::protocol::ServerMsg;

use super::collision::Death;
use super::entity::{Stat, Stuff};
use super::factory;
use super::physics::{Direction, Field};
use super::snapshot::WorldFrame;
use super::spawner;
use super::world::World;

/// Room every session falls back to
pub const DEFAULT_ROOM: &str = "playground";

const COMMAND_BUFFER: usize = 1024;

/// Gameplay input of one avatar
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Move { direction: Direction, held: bool },
    Shoot { x: f64, y: f64, number: u32 },
    Evaluate(Stat),
}

/// Everything that mutates a room goes through here
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        name: String,
        outbound: mpsc::Sender<ServerMsg>,
        reply: oneshot::Sender<Result<Admission, JoinError>>,
    },
    Leave {
        avatar_id: Uuid,
    },
    Input {
        avatar_id: Uuid,
        command: PlayerCommand,
    },
    SpawnStuff(Stuff),
}

/// Successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub avatar_id: Uuid,
    pub room: String,
}

/// Why a join was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Player name must not be empty")]
    EmptyName,

    #[error("Name '{0}' is already taken in this room")]
    DuplicateName(String),

    #[error("Room is full")]
    RoomFull,

    #[error("Room is no longer running")]
    RoomClosed,
}

impl JoinError {
    /// Machine readable code for the `error` envelope
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::EmptyName => "empty_name",
            JoinError::DuplicateName(_) => "duplicate_name",
            JoinError::RoomFull => "room_full",
            JoinError::RoomClosed => "room_closed",
        }
    }
}

/// Cloneable handle to a running room
#[derive(Clone)]
pub struct RoomHandle {
    pub name: String,
    pub framerate: f64,
    pub field: Field,
    commands: mpsc::Sender<RoomCommand>,
    frames: watch::Receiver<Arc<WorldFrame>>,
    session_count: Arc<AtomicUsize>,
    stuff_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    /// Ask the room to admit a player; resolved at the start of the next tick
    pub async fn join(&self, name: String, outbound: mpsc::Sender<ServerMsg>) -> Result<Admission, JoinError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::Join {
                name,
                outbound,
                reply,
            })
            .await
            .map_err(|_| JoinError::RoomClosed)?;
        response.await.map_err(|_| JoinError::RoomClosed)?
    }

    pub async fn leave(&self, avatar_id: Uuid) {
        let _ = self.commands.send(RoomCommand::Leave { avatar_id }).await;
    }

    /// Queue a gameplay command; false once the room is gone
    pub async fn input(&self, avatar_id: Uuid, command: PlayerCommand) -> bool {
        self.commands
            .send(RoomCommand::Input { avatar_id, command })
            .await
            .is_ok()
    }

    /// Queue a new collectible. Counted right away so the spawner sees it
    /// before the room's next tick.
    pub async fn spawn_stuff(&self, stuff: Stuff) -> bool {
        if self.commands.send(RoomCommand::SpawnStuff(stuff)).await.is_err() {
            return false;
        }
        self.stuff_count.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Receiver of the frame published after every tick
    pub fn frames(&self) -> watch::Receiver<Arc<WorldFrame>> {
        self.frames.clone()
    }

    pub fn session_count(&self) -> usize {
        self.session_count.load(Ordering::Relaxed)
    }

    pub fn stuff_count(&self) -> usize {
        self.stuff_count.load(Ordering::Relaxed)
    }
}

/// The authoritative room task
pub struct GameRoom {
    world: World,
    max_members: usize,
    commands: mpsc::Receiver<RoomCommand>,
    frames: watch::Sender<Arc<WorldFrame>>,
    sessions: HashMap<Uuid, mpsc::Sender<ServerMsg>>,
    session_count: Arc<AtomicUsize>,
    stuff_count: Arc<AtomicUsize>,
    rng: ChaCha8Rng,
}

impl GameRoom {
    /// Build a room and seed its initial collectibles and traps
    pub fn new(name: &str, config: &RoomConfig, seed: u64) -> (Self, RoomHandle) {
        let field = Field::new(config.field_width, config.field_height);
        let mut world = World::new(name, field, config.framerate);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        for _ in 0..config.initial_stuffs {
            if let Some(stuff) = factory::spawn_stuff(&config.stuff_types, &field, &mut rng) {
                world.add_stuff(stuff);
            }
        }
        for _ in 0..config.initial_traps {
            world.add_trap(factory::spawn_trap(&field, &mut rng));
        }

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (frame_tx, frame_rx) = watch::channel(Arc::new(WorldFrame::capture(&world)));
        let session_count = Arc::new(AtomicUsize::new(0));
        let stuff_count = Arc::new(AtomicUsize::new(world.stuffs.len()));

        let handle = RoomHandle {
            name: name.to_string(),
            framerate: config.framerate,
            field,
            commands: command_tx,
            frames: frame_rx,
            session_count: session_count.clone(),
            stuff_count: stuff_count.clone(),
        };

        let room = Self {
            world,
            max_members: config.max_room_members,
            commands: command_rx,
            frames: frame_tx,
            sessions: HashMap::new(),
            session_count,
            stuff_count,
            rng,
        };

        (room, handle)
    }

    /// Run the tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!(
            room = %self.world.name,
            stuffs = self.world.stuffs.len(),
            traps = self.world.traps.len(),
            "Room started"
        );

        let mut ticker = interval(tick_duration(self.world.framerate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let open = self.process_commands();

            let deaths = self.world.step();
            self.report_deaths(&deaths);

            self.stuff_count.store(self.world.stuffs.len(), Ordering::Relaxed);
            self.frames.send_replace(Arc::new(WorldFrame::capture(&self.world)));

            if !open {
                info!(room = %self.world.name, "Room closed");
                break;
            }
        }
    }

    /// Drain the command queue; false once every sender is gone
    fn process_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(RoomCommand::Join {
                    name,
                    outbound,
                    reply,
                }) => self.handle_join(name, outbound, reply),
                Ok(RoomCommand::Leave { avatar_id }) => self.handle_leave(avatar_id),
                Ok(RoomCommand::Input { avatar_id, command }) => self.handle_input(avatar_id, command),
                Ok(RoomCommand::SpawnStuff(stuff)) => {
                    self.world.add_stuff(stuff);
                    self.stuff_count.store(self.world.stuffs.len(), Ordering::Relaxed);
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn admit(&self, name: &str) -> Result<(), JoinError> {
        if name.trim().is_empty() {
            return Err(JoinError::EmptyName);
        }
        if self.world.has_player(name) {
            return Err(JoinError::DuplicateName(name.to_string()));
        }
        if self.sessions.len() >= self.max_members {
            return Err(JoinError::RoomFull);
        }
        Ok(())
    }

    fn handle_join(
        &mut self,
        name: String,
        outbound: mpsc::Sender<ServerMsg>,
        reply: oneshot::Sender<Result<Admission, JoinError>>,
    ) {
        if let Err(err) = self.admit(&name) {
            warn!(room = %self.world.name, player = %name, error = %err, "Join rejected");
            let _ = reply.send(Err(err));
            return;
        }

        let diep = factory::spawn_diep(name.clone(), &self.world.field, &mut self.rng);
        let avatar_id = diep.id();
        let admission = Admission {
            avatar_id,
            room: self.world.name.clone(),
        };

        if reply.send(Ok(admission)).is_err() {
            debug!(room = %self.world.name, player = %name, "Joiner went away before admission");
            return;
        }

        self.world.add_diep(diep);
        self.sessions.insert(avatar_id, outbound);
        self.session_count.store(self.sessions.len(), Ordering::Relaxed);

        info!(
            room = %self.world.name,
            player = %name,
            avatar_id = %avatar_id,
            sessions = self.sessions.len(),
            "Player joined room"
        );
    }

    fn handle_leave(&mut self, avatar_id: Uuid) {
        self.sessions.remove(&avatar_id);
        self.session_count.store(self.sessions.len(), Ordering::Relaxed);

        if let Some(diep) = self.world.remove_diep(avatar_id) {
            info!(
                room = %self.world.name,
                player = %diep.name,
                avatar_id = %avatar_id,
                score = diep.score,
                sessions = self.sessions.len(),
                "Player left room"
            );
        }
    }

    fn handle_input(&mut self, avatar_id: Uuid, command: PlayerCommand) {
        match command {
            PlayerCommand::Move { direction, held } => {
                self.world.set_intent(avatar_id, direction, held);
            }
            PlayerCommand::Shoot { x, y, number } => {
                match self.world.shoot(avatar_id, x, y, number) {
                    Ok(bullets) => {
                        debug!(room = %self.world.name, avatar_id = %avatar_id, x, y, bullets, "Shot fired");
                    }
                    Err(rejected) => {
                        debug!(room = %self.world.name, avatar_id = %avatar_id, reason = %rejected, "Shot rejected");
                        self.notify(
                            avatar_id,
                            ServerMsg::Shoot {
                                message: rejected.to_string(),
                            },
                        );
                    }
                }
            }
            PlayerCommand::Evaluate(stat) => {
                if let Some((from, to)) = self.world.evaluate(avatar_id, stat) {
                    debug!(room = %self.world.name, avatar_id = %avatar_id, ?stat, from, to, "Stat upgraded");
                }
            }
        }
    }

    fn report_deaths(&mut self, deaths: &[Death]) {
        for death in deaths {
            let player = self.world.diep(death.victim).map(|d| d.name.as_str()).unwrap_or_default();
            info!(
                room = %self.world.name,
                player = %player,
                avatar_id = %death.victim,
                killed_by = %death.killed_by,
                "Avatar died"
            );
            self.notify(death.victim, ServerMsg::PlayerDead {});
        }
    }

    /// Direct message to one session; never blocks the tick
    fn notify(&self, avatar_id: Uuid, msg: ServerMsg) {
        if let Some(outbound) = self.sessions.get(&avatar_id) {
            if let Err(err) = outbound.try_send(msg) {
                debug!(room = %self.world.name, avatar_id = %avatar_id, error = %err, "Dropped direct message");
            }
        }
    }
}

/// Start a room and its collectible spawner
fn launch(name: &str, config: &RoomConfig) -> RoomHandle {
    let seed: u64 = rand::random();
    let (room, handle) = GameRoom::new(name, config, seed);
    debug!(room = %name, seed, "Launching room");
    tokio::spawn(room.run());
    tokio::spawn(spawner::run(handle.clone(), config.clone(), seed.wrapping_add(1)));
    handle
}

/// Per-room numbers for the room listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub name: String,
    pub players: usize,
    pub stuffs: usize,
}

/// Registry of all live rooms
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    create_lock: Mutex<()>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Create the registry and start the default room. Needs a tokio runtime.
    pub fn start(config: RoomConfig) -> Self {
        let registry = Self {
            rooms: DashMap::new(),
            create_lock: Mutex::new(()),
            config,
        };
        registry.get_or_create(DEFAULT_ROOM);
        registry
    }

    pub fn get(&self, name: &str) -> Option<RoomHandle> {
        self.rooms.get(name).map(|r| r.value().clone())
    }

    fn get_or_create(&self, name: &str) -> RoomHandle {
        let _guard = self.create_lock.lock();
        if let Some(handle) = self.get(name) {
            return handle;
        }
        let handle = launch(name, &self.config);
        self.rooms.insert(name.to_string(), handle.clone());
        handle
    }

    /// Pick the room for a new session: the named one, a freshly created one
    /// while under the room limit, or the default room
    pub fn select(&self, requested: Option<&str>) -> RoomHandle {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());
        let Some(name) = requested else {
            return self.get_or_create(DEFAULT_ROOM);
        };
        if let Some(handle) = self.get(name) {
            return handle;
        }

        let _guard = self.create_lock.lock();
        if let Some(handle) = self.get(name) {
            return handle;
        }
        if self.rooms.len() < self.config.max_rooms {
            let handle = launch(name, &self.config);
            self.rooms.insert(name.to_string(), handle.clone());
            info!(room = %name, rooms = self.rooms.len(), "Room created");
            return handle;
        }
        drop(_guard);

        warn!(room = %name, max_rooms = self.config.max_rooms, "Room limit reached, using default room");
        self.get_or_create(DEFAULT_ROOM)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().session_count()).sum()
    }

    /// Rooms sorted by name
    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .iter()
            .map(|r| RoomSummary {
                name: r.key().clone(),
                players: r.value().session_count(),
                stuffs: r.value().stuff_count(),
            })
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }
}
