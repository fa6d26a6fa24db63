//! Combat system - shooting, cooldowns, damage

use super::entity::{Bullet, Diep};
use super::factory::{BULLET_RADIUS, DEFAULT_MASS};
use super::physics::{Body, Point, Velocity, RATIO};

/// Health lost per point of the attacker's damage stat on contact
pub const DAMAGE_FACTOR: f64 = 5.0;
/// Upper bound on bullets spawned by one shoot request
pub const MAX_BULLETS_PER_SHOT: u32 = 16;

/// Why a shoot request was refused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShotRejected {
    #[error("You can not shoot while reloading ({remaining_ms:.0} ms left)")]
    CoolingDown { remaining_ms: f64 },

    #[error("Shoot direction must be finite and non-zero")]
    InvalidDirection,
}

/// Combat system for managing weapons and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check if an avatar can fire (cooldown check)
    pub fn can_fire(cooldown_ms: f64) -> bool {
        cooldown_ms <= 0.0
    }

    /// Count the cooldown down by one tick
    pub fn update_cooldown(cooldown_ms: f64, tick_ms: f64) -> f64 {
        (cooldown_ms - tick_ms).max(0.0)
    }

    /// Cooldown added by one shot, in milliseconds. Level 1 reloads in one second
    /// and every level shortens it logarithmically.
    pub fn fire_cooldown(reload_level: u32) -> f64 {
        1000.0 / (f64::from(reload_level.max(1)) + 1.0).log2()
    }

    /// Bullet lifetime in ticks for a penetration level
    pub fn bullet_lifetime(penetration_level: u32) -> u32 {
        penetration_level.saturating_sub(1) * 40 + 250
    }

    /// Bullet speed for a bullet-speed level
    pub fn bullet_speed(speed_level: u32) -> f64 {
        f64::from(speed_level + 10) / RATIO
    }

    /// Contact damage dealt by a damage stat
    pub fn contact_damage(damage_stat: f64) -> f64 {
        damage_stat * DAMAGE_FACTOR
    }

    /// Spawn point just outside the shooter's hull along the aim direction
    pub fn muzzle(shooter: &Diep, x: f64, y: f64) -> Point {
        let length = (x * x + y * y).sqrt();
        if length == 0.0 {
            return shooter.body.position;
        }
        let offset = shooter.body.radius + BULLET_RADIUS + 1.0;
        Point {
            x: shooter.body.position.x + x / length * offset,
            y: shooter.body.position.y + y / length * offset,
        }
    }

    /// Fire `number` bullets along `(x, y)` from the shooter's position
    pub fn fire(shooter: &mut Diep, x: f64, y: f64, number: u32) -> Result<Vec<Bullet>, ShotRejected> {
        if !Self::can_fire(shooter.shoot_cooldown) {
            return Err(ShotRejected::CoolingDown {
                remaining_ms: shooter.shoot_cooldown,
            });
        }
        if !(x.is_finite() && y.is_finite()) || (x == 0.0 && y == 0.0) {
            return Err(ShotRejected::InvalidDirection);
        }

        let number = number.min(MAX_BULLETS_PER_SHOT);
        if number == 0 {
            return Ok(Vec::new());
        }

        let speed = Self::bullet_speed(shooter.stats.bullet_speed);
        let muzzle = Self::muzzle(shooter, x, y);
        let bullets = (0..number)
            .map(|_| {
                let mut body = Body::at_rest(muzzle, DEFAULT_MASS, BULLET_RADIUS);
                body.velocity = Velocity {
                    x: x * speed,
                    y: y * speed,
                };
                Bullet {
                    body,
                    damage: f64::from(shooter.stats.bullet_damage),
                    lifetime: Self::bullet_lifetime(shooter.stats.bullet_penetration),
                    owner: shooter.id(),
                }
            })
            .collect();

        shooter.shoot_cooldown += Self::fire_cooldown(shooter.stats.bullet_reload);
        Ok(bullets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Stat;

    fn shooter() -> Diep {
        Diep::new("gunner".to_string(), Body::at_rest(Point::new(100.0, 200.0), 1.0, 50.0))
    }

    #[test]
    fn test_reload_formula_is_finite_at_level_one() {
        assert_eq!(CombatSystem::fire_cooldown(1), 1000.0);
        assert_eq!(CombatSystem::fire_cooldown(3), 500.0);
        assert!(CombatSystem::fire_cooldown(0).is_finite());
    }

    #[test]
    fn test_fire_spawns_bullets_and_sets_cooldown() {
        let mut d = shooter();
        let bullets = CombatSystem::fire(&mut d, 1.0, 0.0, 3).unwrap();

        assert_eq!(bullets.len(), 3);
        for b in &bullets {
            assert_eq!(b.owner, d.id());
            assert_eq!(b.body.position, Point::new(161.0, 200.0));
            assert_eq!(b.body.velocity.x, 11.0 / RATIO);
            assert_eq!(b.body.velocity.y, 0.0);
            assert_eq!(b.lifetime, 250);
            assert_eq!(b.damage, 1.0);
        }
        assert_eq!(d.shoot_cooldown, 1000.0);
    }

    #[test]
    fn test_fire_rejected_while_cooling_down() {
        let mut d = shooter();
        CombatSystem::fire(&mut d, 0.0, 1.0, 1).unwrap();
        let err = CombatSystem::fire(&mut d, 0.0, 1.0, 1).unwrap_err();
        assert!(matches!(err, ShotRejected::CoolingDown { .. }));
        assert_eq!(d.shoot_cooldown, 1000.0);
    }

    #[test]
    fn test_cooldown_ticks_down_to_zero() {
        let mut cooldown = 30.0;
        cooldown = CombatSystem::update_cooldown(cooldown, 20.0);
        assert_eq!(cooldown, 10.0);
        cooldown = CombatSystem::update_cooldown(cooldown, 20.0);
        assert_eq!(cooldown, 0.0);
        assert!(CombatSystem::can_fire(cooldown));
    }

    #[test]
    fn test_penetration_extends_lifetime() {
        let mut d = shooter();
        d.stats.upgrade(Stat::BulletPenetration);
        let bullets = CombatSystem::fire(&mut d, 0.0, -1.0, 1).unwrap();
        assert_eq!(bullets[0].lifetime, 290);
    }

    #[test]
    fn test_bullet_count_is_capped() {
        let mut d = shooter();
        let bullets = CombatSystem::fire(&mut d, 1.0, 1.0, 10_000).unwrap();
        assert_eq!(bullets.len(), MAX_BULLETS_PER_SHOT as usize);
    }

    #[test]
    fn test_non_finite_direction_is_rejected() {
        let mut d = shooter();
        assert_eq!(
            CombatSystem::fire(&mut d, f64::NAN, 0.0, 1).unwrap_err(),
            ShotRejected::InvalidDirection
        );
        assert_eq!(d.shoot_cooldown, 0.0);
    }

    #[test]
    fn test_zero_direction_is_rejected_without_cooldown() {
        let mut d = shooter();
        assert_eq!(
            CombatSystem::fire(&mut d, 0.0, 0.0, 3).unwrap_err(),
            ShotRejected::InvalidDirection
        );
        assert_eq!(d.shoot_cooldown, 0.0);
        assert_eq!(CombatSystem::fire(&mut d, 0.0, 1.0, 1).unwrap().len(), 1);
    }
}
