//! Pairwise collision detection and resolution

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use super::combat::CombatSystem;
use super::entity::Diep;
use super::physics::Body;
use super::world::World;

/// The far side of a collision. The near side is always an avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionTarget {
    Diep(Uuid),
    Stuff(Uuid),
    Trap(Uuid),
    Bullet(Uuid),
}

impl CollisionTarget {
    pub fn id(&self) -> Uuid {
        match *self {
            CollisionTarget::Diep(id)
            | CollisionTarget::Stuff(id)
            | CollisionTarget::Trap(id)
            | CollisionTarget::Bullet(id) => id,
        }
    }
}

/// Unordered association between an avatar and another entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub diep: Uuid,
    pub target: CollisionTarget,
}

impl CollisionPair {
    /// Same two entities, in either order
    pub fn involves(&self, a: Uuid, b: Uuid) -> bool {
        let target = self.target.id();
        (self.diep == a && target == b) || (self.diep == b && target == a)
    }
}

/// Pending collisions of the current tick
#[derive(Debug, Default, Clone)]
pub struct CollisionList {
    pairs: Vec<CollisionPair>,
}

impl CollisionList {
    /// Record a collision unless the unordered pair is already present.
    /// Returns true when the pair was added.
    pub fn record(&mut self, diep: Uuid, target: CollisionTarget) -> bool {
        let other = target.id();
        if diep == other || self.pairs.iter().any(|p| p.involves(diep, other)) {
            return false;
        }
        self.pairs.push(CollisionPair { diep, target });
        true
    }

    pub fn pairs(&self) -> &[CollisionPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}

/// An avatar killed during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Death {
    pub victim: Uuid,
    pub killed_by: Uuid,
}

/// Entities marked for removal; applied once the pass is over
#[derive(Debug, Default)]
pub struct Removals {
    pub stuffs: HashSet<Uuid>,
    pub traps: HashSet<Uuid>,
    pub bullets: HashSet<Uuid>,
}

impl Removals {
    pub fn is_empty(&self) -> bool {
        self.stuffs.is_empty() && self.traps.is_empty() && self.bullets.is_empty()
    }
}

/// Brute-force detection and effect resolution
pub struct CollisionSystem;

impl CollisionSystem {
    /// Record every overlap between a live avatar and `others`
    fn detect<'a>(
        dieps: &[Diep],
        others: impl Iterator<Item = &'a Body> + Clone,
        target: fn(Uuid) -> CollisionTarget,
        list: &mut CollisionList,
    ) {
        for diep in dieps.iter().filter(|d| d.alive) {
            for other in others.clone() {
                if diep.id() == other.id {
                    continue;
                }
                if diep.body.overlaps(other) {
                    list.record(diep.id(), target(other.id));
                }
            }
        }
    }

    pub fn detect_diep_collisions(dieps: &[Diep], list: &mut CollisionList) {
        let live = dieps.iter().filter(|d| d.alive).map(|d| &d.body);
        Self::detect(dieps, live, CollisionTarget::Diep, list);
    }

    pub fn detect_stuff_collisions(world: &World, list: &mut CollisionList) {
        let stuffs = world.stuffs.iter().map(|s| &s.body);
        Self::detect(&world.dieps, stuffs, CollisionTarget::Stuff, list);
    }

    pub fn detect_trap_collisions(world: &World, list: &mut CollisionList) {
        let traps = world.traps.iter().map(|t| &t.body);
        Self::detect(&world.dieps, traps, CollisionTarget::Trap, list);
    }

    pub fn detect_bullet_collisions(world: &World, list: &mut CollisionList) {
        let bullets = world.bullets.iter().map(|b| &b.body);
        Self::detect(&world.dieps, bullets, CollisionTarget::Bullet, list);
    }

    /// All four categories, in order
    pub fn detect_all(world: &World, list: &mut CollisionList) {
        Self::detect_diep_collisions(&world.dieps, list);
        Self::detect_stuff_collisions(world, list);
        Self::detect_trap_collisions(world, list);
        Self::detect_bullet_collisions(world, list);
    }

    /// Apply the effects of every pair. Removals are only marked here; a pair
    /// whose entity is gone, already marked, or whose avatar already died is
    /// skipped.
    pub fn resolve(world: &mut World, pairs: &[CollisionPair], removals: &mut Removals) -> Vec<Death> {
        let mut deaths = Vec::new();

        for pair in pairs {
            let Some(a) = world.live_diep_index(pair.diep) else {
                debug!(room = %world.name, avatar_id = %pair.diep, "Skipping collision of departed avatar");
                continue;
            };

            match pair.target {
                CollisionTarget::Diep(other_id) => {
                    let Some(b) = world.live_diep_index(other_id) else {
                        debug!(room = %world.name, avatar_id = %other_id, "Skipping collision of departed avatar");
                        continue;
                    };

                    let combined = world.dieps[a]
                        .body
                        .acceleration
                        .combined(&world.dieps[b].body.acceleration);
                    let damage_to_a = CombatSystem::contact_damage(f64::from(world.dieps[b].stats.body_damage));
                    let damage_to_b = CombatSystem::contact_damage(f64::from(world.dieps[a].stats.body_damage));

                    world.dieps[a].body.acceleration = combined;
                    world.dieps[b].body.acceleration = combined;

                    if world.dieps[a].take_damage(damage_to_a) {
                        kill(&mut world.dieps[a], other_id, &mut deaths);
                    }
                    if world.dieps[b].take_damage(damage_to_b) {
                        kill(&mut world.dieps[b], pair.diep, &mut deaths);
                    }
                }
                CollisionTarget::Stuff(stuff_id) => {
                    if removals.stuffs.contains(&stuff_id) {
                        continue;
                    }
                    let Some(s) = world.stuffs.iter().position(|s| s.id() == stuff_id) else {
                        debug!(room = %world.name, stuff_id = %stuff_id, "Skipping collision of missing stuff");
                        continue;
                    };

                    let diep = &mut world.dieps[a];
                    let stuff = &mut world.stuffs[s];

                    let combined = diep.body.acceleration.combined(&stuff.body.acceleration);
                    diep.body.acceleration = combined;
                    stuff.body.acceleration = combined;

                    let diep_died = diep.take_damage(CombatSystem::contact_damage(stuff.body_damage));
                    stuff.health -= CombatSystem::contact_damage(f64::from(diep.stats.body_damage));

                    if stuff.health <= 0.0 {
                        diep.gain_experience(stuff.experience);
                        removals.stuffs.insert(stuff_id);
                        debug!(
                            room = %world.name,
                            stuff_id = %stuff_id,
                            killed_by = %pair.diep,
                            experience = stuff.experience,
                            "Stuff destroyed"
                        );
                    }
                    if diep_died {
                        kill(diep, stuff_id, &mut deaths);
                    }
                }
                CollisionTarget::Trap(trap_id) => {
                    if removals.traps.contains(&trap_id) {
                        continue;
                    }
                    let Some(t) = world.traps.iter().position(|t| t.id() == trap_id) else {
                        debug!(room = %world.name, trap_id = %trap_id, "Skipping collision of missing trap");
                        continue;
                    };

                    let trap = &world.traps[t];
                    let diep = &mut world.dieps[a];
                    diep.body.acceleration = diep.body.acceleration.reflected();
                    if diep.take_damage(CombatSystem::contact_damage(trap.attributes.body_damage)) {
                        kill(diep, trap_id, &mut deaths);
                    }
                    if trap.attributes.health <= 0.0 {
                        removals.traps.insert(trap_id);
                    }
                }
                CollisionTarget::Bullet(bullet_id) => {
                    if removals.bullets.contains(&bullet_id) {
                        continue;
                    }
                    let Some(b) = world.bullets.iter().position(|b| b.id() == bullet_id) else {
                        debug!(room = %world.name, bullet_id = %bullet_id, "Skipping collision of missing bullet");
                        continue;
                    };

                    let bullet = &world.bullets[b];
                    let diep = &mut world.dieps[a];
                    if bullet.owner != diep.id()
                        && diep.take_damage(CombatSystem::contact_damage(bullet.damage))
                    {
                        kill(diep, bullet.owner, &mut deaths);
                    }
                    removals.bullets.insert(bullet_id);
                }
            }
        }

        deaths
    }
}

fn kill(diep: &mut Diep, killed_by: Uuid, deaths: &mut Vec<Death>) {
    diep.alive = false;
    deaths.push(Death {
        victim: diep.id(),
        killed_by,
    });
}
