//! # World Property Tests
//!
//! Cross-module guarantees of the tick pipeline: physics, contacts, damage,
//! destruction and animation observed through the event stream.
//!
//! Run with: cargo test -p bloxim --test world_properties_test

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use bloxim::bloxim_anim::{AnimationTarget, Direction, Keyframe, PlaybackOptions};
use bloxim::bloxim_core::{EntityConfig, EntityId};
use bloxim::bloxim_shared::Vec3;
use bloxim::bloxim_voxel::{VoxelCell, VoxelGrid};
use bloxim::{ContactKey, EventCategory, EventFilter, GameEvent, World};

fn floor_world() -> World {
    let mut world = World::default();
    let stone = world.registry().cell("stone").unwrap();
    world.fill_voxels([0, 0, 0], [15, 0, 15], stone);
    world
}

fn record(world: &mut World, filter: EventFilter) -> Rc<RefCell<Vec<GameEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    world.on(filter, move |_, event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });
    seen
}

fn run(world: &mut World, ticks: usize) {
    for _ in 0..ticks {
        world.tick();
    }
}

// ============================================================================
// PHYSICS
// ============================================================================

#[test]
fn falling_body_comes_to_rest_on_one_voxel() {
    let mut world = floor_world();
    let id = world.spawn(EntityConfig::at(Vec3::new(0.0, 10.0, 0.0))).unwrap();

    run(&mut world, 100);

    let contacts = world.contacts().contacts_of(id);
    assert_eq!(contacts.len(), 1);
    assert_eq!(
        contacts[0].key,
        ContactKey::Voxel {
            entity: id,
            coord: [0, 0, 0]
        }
    );

    let body = world.entity(id).unwrap();
    assert!(body.velocity.y.abs() < 1e-3);
    assert!((body.position.y - 1.5).abs() < 1e-3);
}

#[test]
fn every_separate_follows_one_begin() {
    let mut world = floor_world();
    let seen = record(&mut world, EventFilter::any());
    let a = world.spawn(EntityConfig::at(Vec3::new(4.0, 3.0, 4.0))).unwrap();
    world
        .spawn(EntityConfig::at(Vec3::new(4.4, 5.0, 4.2)).with_tag("stacked"))
        .unwrap();

    for round in 0..4 {
        run(&mut world, 30);
        if round % 2 == 0 {
            world.apply_impulse(a, Vec3::new(0.0, 8.0, 0.0));
        }
    }

    let mut open: BTreeSet<ContactKey> = BTreeSet::new();
    let (mut begins, mut separates) = (0, 0);
    for event in seen.borrow().iter() {
        match event {
            GameEvent::ContactBegin(contact) => {
                assert!(open.insert(contact.key), "second begin for {:?}", contact.key);
                begins += 1;
            }
            GameEvent::ContactSeparate(key) => {
                assert!(open.remove(key), "separate without begin for {key:?}");
                separates += 1;
            }
            _ => {}
        }
    }
    assert!(begins > 0);
    assert!(separates > 0);
}

#[test]
fn filtered_pair_never_touches() {
    let mut world = World::default();
    world.add_collision_filter(".ghost", "*").unwrap();
    let seen = record(&mut world, EventFilter::category(EventCategory::ContactBegin));

    let ghost = world
        .spawn(
            EntityConfig::at(Vec3::new(5.0, 5.4, 5.0))
                .with_tag("ghost")
                .without_gravity(),
        )
        .unwrap();
    let wall = world.spawn(EntityConfig::at(Vec3::new(5.0, 5.0, 5.0)).fixed()).unwrap();

    run(&mut world, 10);

    assert!(seen.borrow().is_empty());
    assert!(world
        .contacts()
        .contacts()
        .all(|contact| !(contact.key.involves(ghost) && contact.key.involves(wall))));

    // Same layout without the tag does touch.
    let solid = world
        .spawn(EntityConfig::at(Vec3::new(5.0, 5.4, 5.0)).without_gravity())
        .unwrap();
    run(&mut world, 2);
    assert!(seen
        .borrow()
        .iter()
        .any(|event| event.involves(solid) && event.involves(wall)));
}

#[test]
fn sinking_body_enters_and_leaves_water_once() {
    let mut world = World::default();
    let water = world.registry().cell("water").unwrap();
    world.fill_voxels([3, 2, 3], [5, 5, 5], water);
    let seen = record(&mut world, EventFilter::category(EventCategory::Fluid));

    let anchor = EntityConfig {
        mass: 50.0,
        ..EntityConfig::at(Vec3::new(4.5, 10.0, 4.5))
    };
    let anchor = world.spawn(anchor).unwrap();

    run(&mut world, 100);

    let material = water.material();
    let events = seen.borrow();
    assert_eq!(events.len(), 2, "fluid events: {events:?}");
    assert!(matches!(
        &events[0],
        GameEvent::FluidEnter(contact) if contact.entity == anchor && contact.material == material
    ));
    assert_eq!(
        events[1],
        GameEvent::FluidLeave {
            entity: anchor,
            material
        }
    );
    assert!(world.entity(anchor).unwrap().position.y < 1.5);
}

// ============================================================================
// DESTRUCTION
// ============================================================================

#[test]
fn destroyed_entity_is_never_named_again() {
    let mut world = floor_world();
    let doomed = world
        .spawn(EntityConfig::at(Vec3::new(4.0, 3.0, 4.0)).with_damage(10.0))
        .unwrap();
    let bystander = world.spawn(EntityConfig::at(Vec3::new(10.0, 3.0, 10.0))).unwrap();
    world
        .animate(
            AnimationTarget::Entity(doomed),
            vec![
                Keyframe::after(0.0).scalar("glow", 0.0),
                Keyframe::after(0.2).scalar("glow", 1.0),
            ],
            PlaybackOptions::default().iterations(f32::INFINITY),
        )
        .unwrap();

    let log: Rc<RefCell<Vec<GameEvent>>> = Rc::default();
    let cut: Rc<RefCell<Option<usize>>> = Rc::default();
    let (sink, mark) = (Rc::clone(&log), Rc::clone(&cut));
    world.on(EventFilter::any(), move |cx, event| {
        sink.borrow_mut().push(event.clone());
        let first_touch = matches!(event, GameEvent::ContactBegin(c) if c.key.involves(doomed));
        if first_touch && mark.borrow().is_none() {
            assert!(cx.world.destroy(doomed));
            assert!(!cx.world.hurt(doomed, 5.0, None));
            *mark.borrow_mut() = Some(sink.borrow().len());
        }
        Ok(())
    });

    run(&mut world, 60);

    let cut = cut.borrow().expect("doomed entity never touched the floor");
    let log = log.borrow();
    for event in &log[cut..] {
        if event.category() != EventCategory::Lifecycle {
            assert!(!event.involves(doomed), "late event {event:?}");
        }
    }
    assert!(log[cut..].contains(&GameEvent::EntityDestroyed { entity: doomed }));
    assert!(world.contacts().contacts_of(doomed).is_empty());
    assert!(!world.contacts().contacts_of(bystander).is_empty());
    assert!(world.animations().instances_of(AnimationTarget::Entity(doomed)).is_empty());
}

#[test]
fn destroying_twice_is_destroying_once() {
    let mut world = World::default();
    let seen = record(&mut world, EventFilter::category(EventCategory::Lifecycle));
    let id = world.spawn(EntityConfig::default()).unwrap();
    world.tick();

    assert!(world.destroy(id));
    assert!(!world.destroy(id));
    world.tick();
    assert!(!world.destroy(id));
    world.tick();

    let destroyed = seen
        .borrow()
        .iter()
        .filter(|event| matches!(event, GameEvent::EntityDestroyed { .. }))
        .count();
    assert_eq!(destroyed, 1);
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn stale_handles_do_not_alias_new_entities() {
    let mut world = World::default();
    let old: EntityId = world.spawn(EntityConfig::default()).unwrap();
    world.destroy(old);
    world.tick();

    let new = world.spawn(EntityConfig::default().named("fresh")).unwrap();
    assert_ne!(old, new);
    assert!(world.entity(old).is_none());
    assert!(!world.teleport(old, Vec3::ONE));
    assert_eq!(world.snapshot(new).unwrap().name.as_deref(), Some("fresh"));
}

// ============================================================================
// DAMAGE
// ============================================================================

#[test]
fn damage_is_delivered_before_death() {
    let mut world = World::default();
    let seen = record(&mut world, EventFilter::any());
    let target = world
        .spawn(EntityConfig::at(Vec3::new(5.0, 20.0, 5.0)).with_damage(10.0))
        .unwrap();

    assert!(world.hurt(target, 4.0, None));
    assert!(world.hurt(target, 20.0, None));
    assert!(world.hurt(target, 5.0, None));
    world.tick();

    let kinds: Vec<&str> = seen
        .borrow()
        .iter()
        .filter_map(|event| match event {
            GameEvent::Damage { .. } => Some("damage"),
            GameEvent::Die { .. } => Some("die"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["damage", "damage", "die"]);

    let body = world.entity(target).unwrap();
    assert_eq!(body.health.hp, 0.0);
    assert!(body.health.dead);
    assert!(!world.hurt(target, 1.0, None));
}

// ============================================================================
// VOXELS
// ============================================================================

#[test]
fn voxel_writes_read_back() {
    let mut world = World::default();
    let registry = world.registry().clone();
    let sand = registry.cell("sand").unwrap();
    let wood = registry.cell("wood").unwrap();

    for (i, coord) in [[0, 0, 0], [63, 63, 63], [12, 40, 7], [1, 2, 3]].iter().enumerate() {
        let cell = if i % 2 == 0 { sand } else { wood };
        world.set_voxel(coord[0], coord[1], coord[2], cell);
        assert_eq!(world.voxel(coord[0], coord[1], coord[2]), cell);
    }

    world.set_voxel(-1, 0, 0, sand);
    assert_eq!(world.voxel(-1, 0, 0), VoxelCell::AIR);
    assert_eq!(world.voxel(64, 0, 0), VoxelCell::AIR);
}

#[test]
fn voxel_snapshot_restores_terrain() {
    let mut world = floor_world();
    let bytes = world.voxels().to_bytes();

    let stone = world.registry().cell("stone").unwrap();
    let mut restored = World::default();
    *restored.voxels_mut() = VoxelGrid::from_bytes(&bytes).unwrap();
    assert_eq!(restored.voxel(7, 0, 7), stone);
    assert_eq!(restored.voxel(7, 1, 7), VoxelCell::AIR);
}

#[test]
fn malformed_snapshot_leaves_terrain_untouched() {
    let mut world = floor_world();
    let stone = world.registry().cell("stone").unwrap();
    let mut bytes = world.voxels().to_bytes();

    // Header shape bytes (after magic and version) claim a huge grid.
    bytes[8..16].copy_from_slice(&[0xFF; 8]);
    assert!(VoxelGrid::from_bytes(&bytes).is_err());
    assert!(world.voxels_mut().restore(&bytes).is_err());
    assert_eq!(world.voxel(7, 0, 7), stone);

    assert!(world.voxels_mut().restore(&bytes[..12]).is_err());
    assert_eq!(world.voxel(7, 0, 7), stone);
}

// ============================================================================
// ANIMATION
// ============================================================================

#[test]
fn alternate_two_iterations_ends_at_start() {
    let mut world = World::default();
    let id = world
        .animate(
            AnimationTarget::World,
            vec![
                Keyframe::after(0.0).scalar("x", 0.0),
                Keyframe::after(1.0).scalar("x", 10.0),
            ],
            PlaybackOptions::default()
                .iterations(2.0)
                .direction(Direction::Alternate),
        )
        .unwrap();

    run(&mut world, 60);

    assert!(world.animation_state(id).is_none());
    let x = world
        .cosmetic(AnimationTarget::World, "x")
        .and_then(serde_json::Value::as_f64)
        .unwrap();
    assert!(x.abs() < 1e-4, "ended at {x}");
}

#[test]
fn zone_force_lifts_matching_bodies() {
    let mut world = World::default();
    world
        .add_zone(
            bloxim::bloxim_shared::Bounds3::new(Vec3::ZERO, Vec3::splat(32.0)),
            ".balloon",
            Vec3::new(0.0, 20.0, 0.0),
            bloxim::Ambient::default(),
        )
        .unwrap();
    let balloon = world
        .spawn(EntityConfig::at(Vec3::new(8.0, 8.0, 8.0)).with_tag("balloon"))
        .unwrap();
    let rock = world.spawn(EntityConfig::at(Vec3::new(16.0, 8.0, 8.0))).unwrap();

    run(&mut world, 10);

    assert!(world.entity(balloon).unwrap().position.y > 8.0);
    assert!(world.entity(rock).unwrap().position.y < 8.0);
}
