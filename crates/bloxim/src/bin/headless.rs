//! # BLOXIM Headless Runner
//!
//! Runs a world without any presentation layer: builds a stone floor,
//! drops a few bodies on it and ticks in real time.
//!
//! ```bash
//! # Default world, 200 ticks
//! bloxim-headless
//!
//! # Custom config and tick count
//! RUST_LOG=bloxim=debug bloxim-headless world.toml 600
//! ```

use std::path::Path;
use std::process::ExitCode;

use bloxim::bloxim_core::EntityConfig;
use bloxim::bloxim_shared::Vec3;
use bloxim::{EventCategory, EventFilter, GameEvent, MemoryStore, TickClock, World, WorldConfig};

const DEFAULT_TICKS: u64 = 200;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(arg: Option<&str>) -> Result<WorldConfig, bloxim::ConfigError> {
    match arg {
        Some(path) => WorldConfig::load(Path::new(path)),
        None => Ok(WorldConfig::default()),
    }
}

fn build_scene(world: &mut World) -> Result<(), Box<dyn std::error::Error>> {
    let [sx, _, sz] = world.config().grid_shape;
    let (max_x, max_z) = (i32::try_from(sx)? - 1, i32::try_from(sz)? - 1);
    let stone = world.registry().cell("stone")?;
    let filled = world.fill_voxels([0, 0, 0], [max_x, 0, max_z], stone);
    tracing::info!(voxels = filled, "floor built");

    for i in 0..5u8 {
        let offset = f32::from(i) * 2.5;
        world.spawn(
            EntityConfig::at(Vec3::new(4.0 + offset, 6.0 + offset, 4.0))
                .named(format!("crate-{i}"))
                .with_tag("crate")
                .with_damage(100.0),
        )?;
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let config_arg = args.next();
    let ticks = args
        .next()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_TICKS);

    let config = match load_config(config_arg.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load config");
            return ExitCode::FAILURE;
        }
    };
    let tick_rate = config.tick_rate;

    let mut world = match World::new(config) {
        Ok(world) => world,
        Err(err) => {
            tracing::error!(error = %err, "failed to build world");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = build_scene(&mut world) {
        tracing::error!(error = %err, "failed to build scene");
        return ExitCode::FAILURE;
    }

    let worker = world
        .take_storage_endpoint()
        .map(|endpoint| endpoint.spawn(MemoryStore::new()));
    if let Some(Err(err)) = &worker {
        tracing::warn!(error = %err, "storage worker did not start");
    }

    world.on(EventFilter::category(EventCategory::ContactBegin), |_, event| {
        if let GameEvent::ContactBegin(contact) = event {
            tracing::info!(key = ?contact.key, force = ?contact.force, "contact");
        }
        Ok(())
    });

    let mut clock = TickClock::new(tick_rate);
    tracing::info!(ticks, tick_rate, "simulation started");
    while world.tick_count() < ticks {
        clock.drive(&mut world);
    }

    let stats = clock.stats();
    tracing::info!(
        ticks = stats.ticks,
        skipped = stats.skipped,
        mean_us = stats.mean_tick_us(),
        max_us = stats.max_tick_us,
        late = stats.late,
        entities = world.entity_count(),
        contacts = world.contacts().len(),
        "simulation finished"
    );
    for error in world.take_host_errors() {
        tracing::warn!(%error, "handler failure");
    }
    ExitCode::SUCCESS
}
