//! Entity construction with initial kinematic state

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::StuffTypeTable;

use super::entity::{Diep, Stuff, Trap, TrapAttributes};
use super::physics::{Body, Field, Point};

pub const DIEP_RADIUS: f64 = 50.0;
pub const STUFF_RADIUS: f64 = 50.0;
pub const TRAP_RADIUS: f64 = 60.0;
pub const BULLET_RADIUS: f64 = 10.0;
pub const DEFAULT_MASS: f64 = 1.0;

/// Uniformly random point inside the field
pub fn random_position<R: Rng + ?Sized>(field: &Field, rng: &mut R) -> Point {
    Point::new(
        rng.gen_range(0.0..=field.width),
        rng.gen_range(0.0..=field.height),
    )
}

/// A fresh avatar at a random position
pub fn spawn_diep<R: Rng + ?Sized>(name: String, field: &Field, rng: &mut R) -> Diep {
    let body = Body::at_rest(random_position(field, rng), DEFAULT_MASS, DIEP_RADIUS);
    Diep::new(name, body)
}

/// A collectible of a uniformly chosen type at a random position.
/// `None` only if the table is empty.
pub fn spawn_stuff<R: Rng + ?Sized>(
    table: &StuffTypeTable,
    field: &Field,
    rng: &mut R,
) -> Option<Stuff> {
    let codes = table.codes();
    let code = *codes.choose(rng)?;
    let attributes = table.get(code)?;
    let body = Body::at_rest(random_position(field, rng), DEFAULT_MASS, STUFF_RADIUS);
    Some(Stuff::new(code, attributes, body))
}

pub fn spawn_trap<R: Rng + ?Sized>(field: &Field, rng: &mut R) -> Trap {
    Trap {
        body: Body::at_rest(random_position(field, rng), DEFAULT_MASS, TRAP_RADIUS),
        attributes: TrapAttributes::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_spawned_entities_are_inside_field() {
        let field = Field::new(300.0, 200.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let d = spawn_diep("p".to_string(), &field, &mut rng);
            assert!(d.body.position.x >= 0.0 && d.body.position.x <= 300.0);
            assert!(d.body.position.y >= 0.0 && d.body.position.y <= 200.0);
            let t = spawn_trap(&field, &mut rng);
            assert!(t.body.position.y <= 200.0);
        }
    }

    #[test]
    fn test_stuff_types_come_from_table() {
        let table = StuffTypeTable::default();
        let field = Field::new(1000.0, 1000.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..400 {
            let stuff = spawn_stuff(&table, &field, &mut rng).unwrap();
            let attributes = table.get(stuff.kind).unwrap();
            assert_eq!(stuff.health, attributes.health);
            assert_eq!(stuff.experience, attributes.experience);
            seen.insert(stuff.kind);
        }
        assert_eq!(seen.len(), table.len());
    }

    #[test]
    fn test_ids_are_unique() {
        let field = Field::new(10.0, 10.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ids: HashSet<_> = (0..100)
            .map(|_| spawn_diep("p".to_string(), &field, &mut rng).id())
            .collect();
        assert_eq!(ids.len(), 100);
    }
}
