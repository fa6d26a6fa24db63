//! Avatars, bullets, collectibles and traps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StuffType;

use super::physics::{Body, MoveIntent};

/// Base health of an avatar at max-health level 1
pub const BASE_HEALTH: f64 = 100.0;
/// Extra max health granted per max-health level above 1
pub const HEALTH_PER_LEVEL: f64 = 20.0;
/// Experience needed grows quadratically with level
const EXPERIENCE_PER_LEVEL_STEP: f64 = 20.0;

/// Upgradeable stat names accepted by `evaluation` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    MaxHealth,
    HealthRegeneration,
    MoveSpeed,
    BulletSpeed,
    BulletPenetration,
    BulletReload,
    BulletDamage,
    BodyDamage,
}

impl Stat {
    /// Parse a wire stat name; unknown names yield `None`
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "MaxHP" => Some(Self::MaxHealth),
            "HPRegeneration" => Some(Self::HealthRegeneration),
            "MoveSpeed" => Some(Self::MoveSpeed),
            "BulletSpeed" => Some(Self::BulletSpeed),
            "BulletPenetration" => Some(Self::BulletPenetration),
            "BulletReload" => Some(Self::BulletReload),
            "BulletDamage" => Some(Self::BulletDamage),
            "BodyDamage" => Some(Self::BodyDamage),
            _ => None,
        }
    }
}

/// Stat levels, all starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub max_health: u32,
    pub health_regeneration: u32,
    pub move_speed: u32,
    pub bullet_speed: u32,
    pub bullet_penetration: u32,
    pub bullet_reload: u32,
    pub bullet_damage: u32,
    pub body_damage: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            max_health: 1,
            health_regeneration: 1,
            move_speed: 1,
            bullet_speed: 1,
            bullet_penetration: 1,
            bullet_reload: 1,
            bullet_damage: 1,
            body_damage: 1,
        }
    }
}

impl Stats {
    /// Raise one stat by a level, returning (from, to)
    pub fn upgrade(&mut self, stat: Stat) -> (u32, u32) {
        let level = match stat {
            Stat::MaxHealth => &mut self.max_health,
            Stat::HealthRegeneration => &mut self.health_regeneration,
            Stat::MoveSpeed => &mut self.move_speed,
            Stat::BulletSpeed => &mut self.bullet_speed,
            Stat::BulletPenetration => &mut self.bullet_penetration,
            Stat::BulletReload => &mut self.bullet_reload,
            Stat::BulletDamage => &mut self.bullet_damage,
            Stat::BodyDamage => &mut self.body_damage,
        };
        let from = *level;
        *level += 1;
        (from, *level)
    }
}

/// Player-controlled avatar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diep {
    #[serde(flatten)]
    pub body: Body,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub score: u64,
    pub level: u32,
    pub experience: u64,
    pub health: f64,
    /// Milliseconds until the next shot is allowed
    pub shoot_cooldown: f64,
    pub stats: Stats,
    pub intent: MoveIntent,
    pub alive: bool,
}

impl Diep {
    pub fn new(name: String, body: Body) -> Self {
        let stats = Stats::default();
        Self {
            body,
            name,
            created_at: Utc::now(),
            score: 0,
            level: 1,
            experience: 0,
            health: max_health_for(stats.max_health),
            shoot_cooldown: 0.0,
            stats,
            intent: MoveIntent::default(),
            alive: true,
        }
    }

    pub fn id(&self) -> Uuid {
        self.body.id
    }

    pub fn move_speed(&self) -> f64 {
        f64::from(self.stats.move_speed)
    }

    /// Subtract health; returns true when this blow brought it to 0 or below
    pub fn take_damage(&mut self, amount: f64) -> bool {
        self.health -= amount;
        self.health <= 0.0
    }

    /// Spend one upgrade. A MaxHP level also grants the health it adds.
    pub fn upgrade(&mut self, stat: Stat) -> (u32, u32) {
        let levels = self.stats.upgrade(stat);
        if stat == Stat::MaxHealth {
            self.health += HEALTH_PER_LEVEL;
        }
        levels
    }

    /// Credit experience from a destroyed collectible
    pub fn gain_experience(&mut self, amount: u32) {
        self.experience += u64::from(amount);
        self.score += u64::from(amount);
        self.level = level_for(self.experience);
    }
}

fn max_health_for(level: u32) -> f64 {
    BASE_HEALTH + f64::from(level.saturating_sub(1)) * HEALTH_PER_LEVEL
}

fn level_for(experience: u64) -> u32 {
    1 + (experience as f64 / EXPERIENCE_PER_LEVEL_STEP).sqrt().floor() as u32
}

/// Projectile fired by an avatar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    #[serde(flatten)]
    pub body: Body,
    pub damage: f64,
    /// Remaining ticks
    pub lifetime: u32,
    pub owner: Uuid,
}

impl Bullet {
    pub fn id(&self) -> Uuid {
        self.body.id
    }

    /// Count down one tick; returns false once expired
    pub fn tick_lifetime(&mut self) -> bool {
        self.lifetime = self.lifetime.saturating_sub(1);
        self.lifetime > 0
    }
}

/// Collectible object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stuff {
    #[serde(flatten)]
    pub body: Body,
    #[serde(rename = "type")]
    pub kind: u32,
    pub health: f64,
    pub experience: u32,
    pub body_damage: f64,
}

impl Stuff {
    pub fn new(kind: u32, attributes: &StuffType, body: Body) -> Self {
        Self {
            body,
            kind,
            health: attributes.health,
            experience: attributes.experience,
            body_damage: attributes.body_damage,
        }
    }

    pub fn id(&self) -> Uuid {
        self.body.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapAttributes {
    pub bullet_speed: f64,
    pub bullet_damage: f64,
    pub bullet_reload: f64,
    pub body_damage: f64,
    pub health: f64,
}

impl Default for TrapAttributes {
    fn default() -> Self {
        Self {
            bullet_speed: 1.0,
            bullet_damage: 1.0,
            bullet_reload: 1.0,
            body_damage: 2.0,
            health: 1000.0,
        }
    }
}

/// Static hazard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trap {
    #[serde(flatten)]
    pub body: Body,
    pub attributes: TrapAttributes,
}

impl Trap {
    pub fn id(&self) -> Uuid {
        self.body.id
    }
}
