//! World frames and per-player culled views

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{Bullet, Diep, Stuff, Trap};
use super::physics::{Field, Point};
use super::world::World;

/// Visible area width around an avatar
pub const VIEWPORT_WIDTH: f64 = 1920.0;
/// Visible area height around an avatar
pub const VIEWPORT_HEIGHT: f64 = 1080.0;

/// Immutable copy of a room after one tick, shared with every session
#[derive(Debug, Clone)]
pub struct WorldFrame {
    pub tick: u64,
    pub field: Field,
    pub dieps: Vec<Diep>,
    pub stuffs: Vec<Stuff>,
    pub traps: Vec<Trap>,
    pub bullets: Vec<Bullet>,
}

impl WorldFrame {
    #[cfg(test)]
    pub fn empty(field: Field) -> Self {
        Self {
            tick: 0,
            field,
            dieps: Vec::new(),
            stuffs: Vec::new(),
            traps: Vec::new(),
            bullets: Vec::new(),
        }
    }

    pub fn capture(world: &World) -> Self {
        Self {
            tick: world.tick,
            field: world.field,
            dieps: world.dieps.clone(),
            stuffs: world.stuffs.clone(),
            traps: world.traps.clone(),
            bullets: world.bullets.clone(),
        }
    }

    /// Everything the given avatar can see. `None` once the avatar is gone.
    pub fn view_for(&self, avatar_id: Uuid) -> Option<PlayerView> {
        let player = self.dieps.iter().find(|d| d.id() == avatar_id)?;
        let viewport = Viewport::around(player.body.position, self.field);

        Some(PlayerView {
            player: player.clone(),
            dieps: cull(&self.dieps, &viewport, |d| d.body.position),
            stuffs: cull(&self.stuffs, &viewport, |s| s.body.position),
            traps: cull(&self.traps, &viewport, |t| t.body.position),
            bullets: cull(&self.bullets, &viewport, |b| b.body.position),
        })
    }
}

fn cull<T: Clone>(items: &[T], viewport: &Viewport, position: impl Fn(&T) -> Point) -> Vec<T> {
    items
        .iter()
        .filter(|item| viewport.contains(position(item)))
        .cloned()
        .collect()
}

/// Axis-aligned visible rectangle, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Viewport {
    /// A viewport centred on `center`, shifted back inside the field where it
    /// would stick out. Fields smaller than the viewport are shown whole.
    pub fn around(center: Point, field: Field) -> Self {
        let (left, right) = span(center.x, VIEWPORT_WIDTH, field.width);
        let (top, bottom) = span(center.y, VIEWPORT_HEIGHT, field.height);
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }
}

fn span(center: f64, size: f64, limit: f64) -> (f64, f64) {
    if size >= limit {
        return (0.0, limit);
    }
    let start = (center - size / 2.0).clamp(0.0, limit - size);
    (start, start + size)
}

/// Params of a `playerSession` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub player: Diep,
    pub dieps: Vec<Diep>,
    pub stuffs: Vec<Stuff>,
    pub traps: Vec<Trap>,
    pub bullets: Vec<Bullet>,
}
