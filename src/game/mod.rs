//! Game simulation modules

pub mod collision;
pub mod combat;
pub mod entity;
pub mod factory;
pub mod physics;
pub mod room;
pub mod snapshot;
pub mod spawner;
pub mod world;

pub use room::{JoinError, RoomHandle, RoomRegistry, RoomSummary};
pub use snapshot::WorldFrame;
