//! # Event Dispatch Tests
//!
//! Flush ordering, tokens, one-shot futures and storage round trips as seen
//! from outside the crate.
//!
//! Run with: cargo test -p bloxim --test dispatch_test

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bloxim::bloxim_core::EntityConfig;
use bloxim::bloxim_shared::Vec3;
use bloxim::{
    EventCategory, EventFilter, GameEvent, MemoryStore, StorageError, World, WorldConfig,
};
use serde_json::json;

fn body() -> EntityConfig {
    EntityConfig::at(Vec3::new(5.0, 20.0, 5.0)).with_damage(10.0)
}

// ============================================================================
// ORDERING
// ============================================================================

#[test]
fn flush_follows_category_order() {
    let mut world = World::default();
    let categories: Rc<RefCell<Vec<EventCategory>>> = Rc::default();
    let sink = Rc::clone(&categories);
    world.on(EventFilter::any(), move |_, event| {
        sink.borrow_mut().push(event.category());
        Ok(())
    });

    let (player, entity) = world.join_player("ada", body()).unwrap();
    world.push_chat(player, "hello");
    world.push_input(player, "jump", true);
    world.hurt(entity, 1.0, None);
    world.tick();

    assert_eq!(
        *categories.borrow(),
        vec![
            EventCategory::Lifecycle,
            EventCategory::Lifecycle,
            EventCategory::Damage,
            EventCategory::Input,
            EventCategory::Chat,
            EventCategory::TickEnd,
        ]
    );
}

#[test]
fn raised_events_wait_unless_their_category_is_later() {
    let mut world = World::default();
    let (player, _) = world.join_player("ada", body()).unwrap();

    // Input handler raises chat: later category, same flush.
    world.on(EventFilter::category(EventCategory::Input), move |cx, event| {
        if let GameEvent::InputPress { player, .. } = event {
            cx.world.push_chat(*player, "pressed");
        }
        Ok(())
    });
    // Chat handler raises input: earlier category, next flush.
    world.on(EventFilter::category(EventCategory::Chat), move |cx, event| {
        if matches!(event, GameEvent::Chat { message, .. } if message == "ping") {
            cx.world.push_input(player, "echo", true);
        }
        Ok(())
    });

    let log: Rc<RefCell<Vec<(u64, String)>>> = Rc::default();
    let sink = Rc::clone(&log);
    world.on(EventFilter::any(), move |cx, event| {
        let label = match event {
            GameEvent::InputPress { key, .. } => format!("press {key}"),
            GameEvent::Chat { message, .. } => format!("chat {message}"),
            _ => return Ok(()),
        };
        sink.borrow_mut().push((cx.world.tick_count(), label));
        Ok(())
    });

    world.push_input(player, "jump", true);
    world.tick();
    world.push_chat(player, "ping");
    world.tick();
    world.tick();

    assert_eq!(
        *log.borrow(),
        vec![
            (0, "press jump".to_owned()),
            (0, "chat pressed".to_owned()),
            (1, "chat ping".to_owned()),
            (2, "press echo".to_owned()),
            (2, "chat pressed".to_owned()),
        ]
    );
}

#[test]
fn subscribers_run_in_registration_order() {
    let mut world = World::default();
    let order: Rc<RefCell<Vec<u8>>> = Rc::default();
    for n in 0..3u8 {
        let sink = Rc::clone(&order);
        world.on(EventFilter::category(EventCategory::TickEnd), move |_, _| {
            sink.borrow_mut().push(n);
            Ok(())
        });
    }
    world.tick();
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
}

#[test]
fn destroying_in_a_damage_handler_suppresses_death() {
    let mut world = World::default();
    world.on(EventFilter::category(EventCategory::Damage), |cx, event| {
        if let GameEvent::Damage { entity, hp, .. } = event {
            if *hp <= 0.0 {
                cx.world.destroy(*entity);
            }
        }
        Ok(())
    });
    let log: Rc<RefCell<Vec<GameEvent>>> = Rc::default();
    let sink = Rc::clone(&log);
    world.on(EventFilter::any(), move |_, event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });

    let target = world.spawn(body()).unwrap();
    world.tick();
    assert!(world.hurt(target, 25.0, None));
    world.tick();
    world.tick();

    let log = log.borrow();
    let damage = log
        .iter()
        .position(|event| matches!(event, GameEvent::Damage { entity, .. } if *entity == target))
        .expect("damage delivered");
    let destroyed = log
        .iter()
        .position(|event| *event == GameEvent::EntityDestroyed { entity: target })
        .expect("destruction delivered");
    assert!(damage < destroyed);
    assert!(!log
        .iter()
        .any(|event| matches!(event, GameEvent::Die { .. })));
    assert!(!world.is_live(target));
}

// ============================================================================
// TOKENS
// ============================================================================

#[test]
fn token_cancelled_in_own_handler_stops_after_that_call() {
    let mut world = World::default();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let token = world.on(EventFilter::category(EventCategory::TickEnd), move |cx, _| {
        counter.set(counter.get() + 1);
        assert!(cx.token.cancel());
        Ok(())
    });

    world.tick();
    world.tick();
    world.tick();
    assert_eq!(calls.get(), 1);
    assert!(!token.active());

    assert!(token.resume());
    world.tick();
    assert_eq!(calls.get(), 2);
}

#[test]
fn cancelled_token_skips_events_already_queued() {
    let mut world = World::default();
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    let token = world.on(EventFilter::category(EventCategory::Lifecycle), move |_, _| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    world.spawn(EntityConfig::default()).unwrap();
    token.cancel();
    world.tick();
    assert_eq!(seen.get(), 0);

    assert!(world.unsubscribe(token.id()));
    assert!(!world.unsubscribe(token.id()));
    world.spawn(EntityConfig::default()).unwrap();
    token.resume();
    world.tick();
    assert_eq!(seen.get(), 0);
}

#[test]
fn failing_handler_does_not_stop_dispatch() {
    let mut world = World::default();
    world.on(EventFilter::category(EventCategory::Chat), |_, _| {
        Err("script crashed".into())
    });
    let reached = Rc::new(Cell::new(false));
    let flag = Rc::clone(&reached);
    world.on(EventFilter::category(EventCategory::Chat), move |_, _| {
        flag.set(true);
        Ok(())
    });

    let (player, _) = world.join_player("ada", body()).unwrap();
    world.push_chat(player, "hi");
    world.tick();

    assert!(reached.get());
    let errors = world.take_host_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].category, EventCategory::Chat);
    assert_eq!(errors[0].tick, 0);
}

// ============================================================================
// FUTURES
// ============================================================================

#[test]
fn once_resolves_exactly_once() {
    let mut world = World::default();
    let (player, _) = world.join_player("ada", body()).unwrap();
    let (_token, mut first_chat) = world.once(EventFilter::category(EventCategory::Chat));
    let (_token, mut loud) = world.once_where(EventFilter::category(EventCategory::Chat), |event| {
        matches!(event, GameEvent::Chat { message, .. } if message.ends_with('!'))
    });
    let (_token, never) = world.once(EventFilter::category(EventCategory::Die));

    world.push_chat(player, "hello");
    world.push_chat(player, "again");
    world.tick();
    world.push_chat(player, "hey!");
    world.tick();

    assert_eq!(
        first_chat.try_take(),
        Some(GameEvent::Chat {
            player,
            message: "hello".into()
        })
    );
    assert!(first_chat.try_take().is_none());
    assert_eq!(
        loud.try_take(),
        Some(GameEvent::Chat {
            player,
            message: "hey!".into()
        })
    );
    assert!(!never.is_complete());
}

#[test]
fn cancelled_once_never_resolves() {
    let mut world = World::default();
    let (token, mut next_tick) = world.once(EventFilter::category(EventCategory::TickEnd));
    token.cancel();
    world.tick();
    assert!(next_tick.try_take().is_none());

    token.resume();
    world.tick();
    assert_eq!(
        next_tick.try_take(),
        Some(GameEvent::TickEnd {
            tick: 1,
            skipped: 0
        })
    );
}

// ============================================================================
// STORAGE
// ============================================================================

#[test]
fn storage_resolves_on_a_later_tick() {
    let mut world = World::default();
    let endpoint = world.take_storage_endpoint().unwrap();
    assert!(world.take_storage_endpoint().is_none());
    let mut store = MemoryStore::new();

    let mut written = world.storage().set("best", &json!({ "score": 12 }));
    endpoint.serve_pending(&mut store);
    assert!(written.try_take().is_none());

    world.tick();
    assert_eq!(written.try_take(), Some(Ok(None)));

    let mut read = world.storage().get("best");
    endpoint.serve_pending(&mut store);
    world.tick();
    assert_eq!(read.try_take(), Some(Ok(Some(json!({ "score": 12 })))));
}

#[test]
fn storage_failures_resolve_as_errors() {
    let mut world = World::new(WorldConfig {
        storage_capacity: 1,
        ..WorldConfig::default()
    })
    .unwrap();
    let endpoint = world.take_storage_endpoint().unwrap();

    let mut queued = world.storage().get("a");
    let mut rejected = world.storage().get("b");
    assert_eq!(rejected.try_take(), Some(Err(StorageError::Busy)));

    drop(endpoint);
    world.tick();
    assert_eq!(queued.try_take(), Some(Err(StorageError::Disconnected)));
}
