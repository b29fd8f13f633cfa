//! # Filter Property Tests
//!
//! Drives worlds through seeded random attach/detach/create/destroy
//! sequences and checks every filter against a brute-force model, with and
//! without cursors open.
//!
//! Run with: cargo test --package oroboros_ecs --test filter_properties

use std::collections::HashSet;

use oroboros_ecs::{Component, EntityHandle, FilterId, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Default)]
struct Alpha {
    owner: u32,
}

impl Component for Alpha {
    fn release(&mut self) {
        self.owner = u32::MAX;
    }
}

#[derive(Default)]
struct Beta {
    owner: u32,
}

impl Component for Beta {
    fn release(&mut self) {
        self.owner = u32::MAX;
    }
}

#[derive(Default)]
struct Gamma;

impl Component for Gamma {
    const IGNORE_IN_FILTER: bool = true;

    fn release(&mut self) {}
}

const ALPHA: usize = 0;
const BETA: usize = 1;
const GAMMA: usize = 2;

/// Component presence per entity, as the test believes it to be.
#[derive(Default)]
struct Model {
    entities: Vec<(EntityHandle, [bool; 3])>,
}

struct Signature {
    id: FilterId,
    include: &'static [usize],
    exclude: &'static [usize],
}

impl Signature {
    fn matches(&self, types: &[bool; 3]) -> bool {
        self.include.iter().all(|&t| types[t]) && !self.exclude.iter().any(|&t| types[t])
    }
}

fn signatures(world: &mut World) -> Vec<Signature> {
    vec![
        Signature {
            id: world.resolve::<(Alpha,)>().unwrap(),
            include: &[ALPHA],
            exclude: &[],
        },
        Signature {
            id: world.resolve::<(Alpha, Beta)>().unwrap(),
            include: &[ALPHA, BETA],
            exclude: &[],
        },
        Signature {
            id: world.resolve_excluding::<(Alpha,), (Gamma,)>().unwrap(),
            include: &[ALPHA],
            exclude: &[GAMMA],
        },
        Signature {
            id: world.resolve_excluding::<(Beta, Gamma), (Alpha,)>().unwrap(),
            include: &[BETA, GAMMA],
            exclude: &[ALPHA],
        },
    ]
}

fn attach(world: &mut World, entity: EntityHandle, kind: usize) {
    match kind {
        ALPHA => world.attach::<Alpha>(entity).owner = entity.id(),
        BETA => world.attach::<Beta>(entity).owner = entity.id(),
        _ => {
            world.attach_with(entity, Gamma);
        }
    }
}

fn detach(world: &mut World, entity: EntityHandle, kind: usize) {
    match kind {
        ALPHA => world.detach::<Alpha>(entity),
        BETA => world.detach::<Beta>(entity),
        _ => world.detach::<Gamma>(entity),
    }
}

/// Applies one random operation to both the world and the model.
fn step(rng: &mut StdRng, world: &mut World, model: &mut Model) {
    let roll = rng.gen_range(0..10);
    if model.entities.is_empty() || roll == 0 {
        let entity = world.create();
        let kind = rng.gen_range(0..3);
        attach(world, entity, kind);
        let mut types = [false; 3];
        types[kind] = true;
        model.entities.push((entity, types));
        return;
    }

    let slot = rng.gen_range(0..model.entities.len());
    let (entity, mut types) = model.entities[slot];
    if roll == 1 {
        world.destroy(entity);
        model.entities.swap_remove(slot);
        return;
    }

    let kind = rng.gen_range(0..3);
    if types[kind] {
        detach(world, entity, kind);
        types[kind] = false;
    } else {
        attach(world, entity, kind);
        types[kind] = true;
    }

    if types.iter().any(|&present| present) {
        model.entities[slot].1 = types;
    } else {
        // last component gone: the world recycles the entity
        assert!(!world.is_alive(entity));
        model.entities.swap_remove(slot);
    }
}

fn assert_filters_match(world: &World, model: &Model, signatures: &[Signature]) {
    for signature in signatures {
        let filter = world.filter(signature.id);
        let expected: HashSet<EntityHandle> = model
            .entities
            .iter()
            .filter(|(_, types)| signature.matches(types))
            .map(|(entity, _)| *entity)
            .collect();
        let actual: HashSet<EntityHandle> = filter.entities().iter().copied().collect();

        assert_eq!(actual, expected, "filter {} diverged", signature.id.index());
        assert_eq!(filter.len(), expected.len(), "duplicate members in filter {}", signature.id.index());
    }
}

fn assert_columns_match(world: &World, signatures: &[Signature]) {
    for signature in signatures {
        for (index, &entity) in world.filter(signature.id).entities().iter().enumerate() {
            if signature.include.contains(&ALPHA) {
                let column = world.column::<Alpha>(signature.id, index).unwrap();
                assert_eq!(column.owner, entity.id());
            }
            if signature.include.contains(&BETA) {
                let column = world.column::<Beta>(signature.id, index).unwrap();
                assert_eq!(column.owner, entity.id());
            }
        }
    }
}

#[test]
fn filters_track_random_sequences() {
    let mut rng = StdRng::seed_from_u64(0x0B0B);
    let mut world = World::new();
    let signatures = signatures(&mut world);
    let mut model = Model::default();

    for round in 0..2_000 {
        step(&mut rng, &mut world, &mut model);
        if round % 50 == 0 {
            assert_filters_match(&world, &model, &signatures);
            assert_columns_match(&world, &signatures);
        }
    }
    assert_filters_match(&world, &model, &signatures);
    assert_columns_match(&world, &signatures);
}

#[test]
fn filters_converge_after_locked_passes() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut world = World::new();
    let signatures = signatures(&mut world);
    let mut model = Model::default();

    for _ in 0..200 {
        step(&mut rng, &mut world, &mut model);
    }

    for pass in 0..40 {
        let locked = signatures[pass % signatures.len()].id;
        let mut cursor = world.cursor(locked);
        let visits = cursor.len();
        let mut seen = 0;
        while cursor.next(&world).is_some() {
            seen += 1;
            for _ in 0..rng.gen_range(0..4) {
                step(&mut rng, &mut world, &mut model);
            }
        }
        world.close(cursor);

        assert_eq!(seen, visits);
        assert!(!world.filter(locked).is_locked());
        assert_filters_match(&world, &model, &signatures);
        assert_columns_match(&world, &signatures);
    }
}

#[test]
fn filter_created_late_sees_existing_entities() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut world = World::new();
    let mut model = Model::default();
    for _ in 0..300 {
        step(&mut rng, &mut world, &mut model);
    }

    let signatures = signatures(&mut world);
    assert_filters_match(&world, &model, &signatures);
    assert_columns_match(&world, &signatures);
}

#[test]
fn iteration_reports_snapshot_then_applies_changes() {
    let mut world = World::new();
    let positions = world.resolve::<(Alpha,)>().unwrap();

    let spawn = |world: &mut World| {
        let entity = world.create();
        world.attach::<Alpha>(entity).owner = entity.id();
        world.attach::<Beta>(entity);
        entity
    };
    let a = spawn(&mut world);
    let b = spawn(&mut world);
    let c = spawn(&mut world);
    let d = world.create();
    world.attach::<Beta>(d);

    let mut visited = Vec::new();
    world.each(positions, |world, row| {
        if visited.is_empty() {
            world.detach::<Alpha>(b);
            world.attach::<Alpha>(d).owner = d.id();
        }
        visited.push(row.entity);
    });

    let first: HashSet<_> = visited.into_iter().collect();
    assert_eq!(first, HashSet::from([a, b, c]));

    let mut second = HashSet::new();
    world.each(positions, |_, row| {
        second.insert(row.entity);
    });
    assert_eq!(second, HashSet::from([a, c, d]));
}

#[test]
fn nested_passes_replay_once_outermost_closes() {
    let mut world = World::new();
    let filter = world.resolve::<(Alpha,)>().unwrap();
    let first = world.create();
    world.attach::<Alpha>(first);

    let outer = world.cursor(filter);
    let inner = world.cursor(filter);
    let late = world.create();
    world.attach::<Alpha>(late);

    world.close(inner);
    assert!(world.filter(filter).is_locked());
    assert!(!world.filter(filter).contains(late));

    world.close(outer);
    assert!(world.filter(filter).contains(late));
}
