//! Mutable state of one room and the per-tick step

use tracing::debug;
use uuid::Uuid;

use crate::util::time::tick_millis;

use super::collision::{CollisionList, CollisionSystem, Death, Removals};
use super::combat::{CombatSystem, ShotRejected};
use super::entity::{Bullet, Diep, Stat, Stuff, Trap};
use super::physics::{Direction, Field};

/// Live collections of one room (owned by the room task)
#[derive(Debug)]
pub struct World {
    pub name: String,
    pub field: Field,
    pub framerate: f64,
    pub tick: u64,
    pub dieps: Vec<Diep>,
    pub bullets: Vec<Bullet>,
    pub stuffs: Vec<Stuff>,
    pub traps: Vec<Trap>,
    pending: CollisionList,
}

impl World {
    pub fn new(name: impl Into<String>, field: Field, framerate: f64) -> Self {
        Self {
            name: name.into(),
            field,
            framerate,
            tick: 0,
            dieps: Vec::new(),
            bullets: Vec::new(),
            stuffs: Vec::new(),
            traps: Vec::new(),
            pending: CollisionList::default(),
        }
    }

    /// Index of an avatar that is still alive
    pub fn live_diep_index(&self, id: Uuid) -> Option<usize> {
        self.dieps.iter().position(|d| d.id() == id && d.alive)
    }

    pub fn diep(&self, id: Uuid) -> Option<&Diep> {
        self.dieps.iter().find(|d| d.id() == id)
    }

    fn live_diep_mut(&mut self, id: Uuid) -> Option<&mut Diep> {
        self.dieps.iter_mut().find(|d| d.id() == id && d.alive)
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.dieps.iter().any(|d| d.name == name)
    }

    pub fn add_diep(&mut self, diep: Diep) {
        self.dieps.push(diep);
    }

    pub fn remove_diep(&mut self, id: Uuid) -> Option<Diep> {
        let index = self.dieps.iter().position(|d| d.id() == id)?;
        Some(self.dieps.remove(index))
    }

    pub fn add_stuff(&mut self, stuff: Stuff) {
        self.stuffs.push(stuff);
    }

    pub fn add_trap(&mut self, trap: Trap) {
        self.traps.push(trap);
    }

    /// Press or release a movement key. Ignored for dead or unknown avatars.
    pub fn set_intent(&mut self, id: Uuid, direction: Direction, held: bool) -> bool {
        match self.live_diep_mut(id) {
            Some(diep) => {
                diep.intent.set(direction, held);
                true
            }
            None => false,
        }
    }

    /// Fire from an avatar; returns how many bullets entered the world
    pub fn shoot(&mut self, id: Uuid, x: f64, y: f64, number: u32) -> Result<usize, ShotRejected> {
        let Some(diep) = self.live_diep_mut(id) else {
            return Ok(0);
        };
        let bullets = CombatSystem::fire(diep, x, y, number)?;
        let fired = bullets.len();
        self.bullets.extend(bullets);
        Ok(fired)
    }

    /// Raise one stat of an avatar, returning (from, to)
    pub fn evaluate(&mut self, id: Uuid, stat: Stat) -> Option<(u32, u32)> {
        self.live_diep_mut(id).map(|d| d.upgrade(stat))
    }

    /// Advance exactly one tick and report the avatars that died in it
    pub fn step(&mut self) -> Vec<Death> {
        self.tick += 1;
        let framerate = self.framerate;
        let field = self.field;
        let tick_ms = tick_millis(framerate);

        for diep in self.dieps.iter_mut().filter(|d| d.alive) {
            let move_speed = diep.move_speed();
            diep.body.integrate_driven(diep.intent, move_speed, framerate, &field);
            diep.shoot_cooldown = CombatSystem::update_cooldown(diep.shoot_cooldown, tick_ms);
        }

        self.bullets.retain_mut(|bullet| {
            bullet.body.integrate_ballistic(framerate, &field);
            let live = bullet.tick_lifetime();
            live && !field.touches_edge(bullet.body.position)
        });

        for stuff in &mut self.stuffs {
            stuff.body.integrate_drifting(framerate, &field);
        }

        let mut pending = std::mem::take(&mut self.pending);
        CollisionSystem::detect_all(self, &mut pending);

        let mut removals = Removals::default();
        let deaths = CollisionSystem::resolve(self, pending.pairs(), &mut removals);
        if !pending.is_empty() {
            debug!(
                room = %self.name,
                tick = self.tick,
                pairs = pending.len(),
                deaths = deaths.len(),
                "Resolved collisions"
            );
        }

        self.apply_removals(&removals);
        pending.clear();
        self.pending = pending;

        deaths
    }

    /// Drop everything marked during resolution in one pass
    pub fn apply_removals(&mut self, removals: &Removals) {
        if removals.is_empty() {
            return;
        }
        self.stuffs.retain(|s| !removals.stuffs.contains(&s.id()));
        self.traps.retain(|t| !removals.traps.contains(&t.id()));
        self.bullets.retain(|b| !removals.bullets.contains(&b.id()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StuffType;
    use crate::game::physics::{Body, MoveIntent, Point};
    use crate::util::time::DEFAULT_FRAMERATE;

    fn world() -> World {
        World::new("test", Field::new(1000.0, 800.0), DEFAULT_FRAMERATE)
    }

    fn diep_at(x: f64, y: f64) -> Diep {
        Diep::new("p".to_string(), Body::at_rest(Point::new(x, y), 1.0, 50.0))
    }

    fn weak_stuff_at(x: f64, y: f64) -> Stuff {
        let attributes = StuffType {
            health: 10.0,
            experience: 4,
            body_damage: 1.0,
        };
        Stuff::new(1, &attributes, Body::at_rest(Point::new(x, y), 1.0, 50.0))
    }

    #[test]
    fn test_avatars_stay_inside_field() {
        let mut w = world();
        let mut corner = diep_at(995.0, 5.0);
        corner.intent = MoveIntent {
            right: true,
            up: true,
            ..MoveIntent::default()
        };
        let mut other = diep_at(5.0, 795.0);
        other.intent = MoveIntent {
            left: true,
            down: true,
            ..MoveIntent::default()
        };
        w.add_diep(corner);
        w.add_diep(other);

        for _ in 0..3000 {
            w.step();
            for d in &w.dieps {
                assert!((0.0..=1000.0).contains(&d.body.position.x));
                assert!((0.0..=800.0).contains(&d.body.position.y));
            }
        }
    }

    #[test]
    fn test_bullet_with_one_tick_left_is_removed() {
        let mut w = world();
        w.bullets.push(Bullet {
            body: Body::at_rest(Point::new(500.0, 400.0), 1.0, 10.0),
            damage: 1.0,
            lifetime: 1,
            owner: Uuid::new_v4(),
        });
        w.step();
        assert!(w.bullets.is_empty());
    }

    #[test]
    fn test_bullet_touching_edge_is_removed() {
        let mut w = world();
        let mut body = Body::at_rest(Point::new(999.9, 400.0), 1.0, 10.0);
        body.velocity.x = 50.0;
        w.bullets.push(Bullet {
            body,
            damage: 1.0,
            lifetime: 100,
            owner: Uuid::new_v4(),
        });
        w.step();
        assert!(w.bullets.is_empty());
    }

    #[test]
    fn test_fresh_bullets_survive_their_first_tick() {
        let mut w = world();
        let d = diep_at(500.0, 400.0);
        let id = d.id();
        w.add_diep(d);

        assert_eq!(w.shoot(id, 1.0, 0.0, 2), Ok(2));
        w.step();
        assert_eq!(w.bullets.len(), 2);
        assert_eq!(w.diep(id).unwrap().health, 100.0);
    }

    #[test]
    fn test_cooldown_drains_by_tick_duration() {
        let mut w = world();
        let d = diep_at(500.0, 400.0);
        let id = d.id();
        w.add_diep(d);

        w.shoot(id, 0.0, 1.0, 1).unwrap();
        assert!(w.shoot(id, 0.0, 1.0, 1).is_err());
        for _ in 0..50 {
            w.step();
        }
        assert_eq!(w.diep(id).unwrap().shoot_cooldown, 0.0);
        assert_eq!(w.shoot(id, 0.0, 1.0, 1), Ok(1));
    }

    #[test]
    fn test_dead_avatar_leaves_detection() {
        let mut w = world();
        let mut d = diep_at(500.0, 400.0);
        d.health = 5.0;
        let id = d.id();
        w.add_diep(d);
        w.add_stuff(weak_stuff_at(500.0, 400.0));

        let deaths = w.step();
        assert_eq!(deaths.len(), 1);
        assert_eq!(deaths[0].victim, id);
        assert_eq!(w.diep(id).unwrap().health, 0.0);
        assert!(!w.diep(id).unwrap().alive);
        assert_eq!(w.stuffs[0].health, 5.0);

        assert!(w.step().is_empty());
        assert_eq!(w.stuffs[0].health, 5.0);
        assert!(!w.set_intent(id, Direction::Up, true));
    }

    #[test]
    fn test_shot_without_direction_costs_nothing() {
        let mut w = world();
        let d = diep_at(500.0, 400.0);
        let id = d.id();
        w.add_diep(d);

        assert_eq!(w.shoot(id, 0.0, 0.0, 3), Err(ShotRejected::InvalidDirection));
        assert!(w.bullets.is_empty());
        assert_eq!(w.diep(id).unwrap().shoot_cooldown, 0.0);
        assert_eq!(w.shoot(id, -1.0, 0.0, 1), Ok(1));
    }

    #[test]
    fn test_max_health_evaluations_raise_health() {
        let mut w = world();
        let d = diep_at(500.0, 400.0);
        let id = d.id();
        w.add_diep(d);

        for _ in 0..5 {
            w.evaluate(id, Stat::MaxHealth);
        }
        let d = w.diep(id).unwrap();
        assert_eq!(d.stats.max_health, 6);
        assert_eq!(d.health, 200.0);
    }

    #[test]
    fn test_evaluate_and_intent_for_unknown_avatar() {
        let mut w = world();
        assert_eq!(w.evaluate(Uuid::new_v4(), Stat::MoveSpeed), None);
        assert!(!w.set_intent(Uuid::new_v4(), Direction::Left, true));
        assert_eq!(w.shoot(Uuid::new_v4(), 1.0, 1.0, 1), Ok(0));
    }

    #[test]
    fn test_remove_diep() {
        let mut w = world();
        let d = diep_at(1.0, 1.0);
        let id = d.id();
        w.add_diep(d);
        assert!(w.has_player("p"));
        assert!(w.remove_diep(id).is_some());
        assert!(w.remove_diep(id).is_none());
        assert!(w.dieps.is_empty());
    }
}
