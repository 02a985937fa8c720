//! Flipit headless runner
//!
//! Drives the simulation with a scripted pilot and logs what happens.
//! Usage: `flipit [settings.json] [--seed N] [--ticks N]`

use flipit::consts::*;
use flipit::sim::{SimEvent, TickInput, WorldState, tick};
use flipit::{Settings, heading_of, normalize_angle};

/// Host frame length; deliberately not a multiple of the sim step
const FRAME_MS: f64 = 1000.0 / 50.0;
/// Max sim steps per host frame (spiral-of-death guard)
const MAX_SUBSTEPS: u32 = 5;

struct Args {
    settings: Settings,
    seed: u64,
    ticks: u64,
}

fn parse_args() -> Args {
    let mut args = Args {
        settings: Settings::default(),
        seed: 0x5eed,
        ticks: 3600,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => match iter.next().map(|v| v.parse()) {
                Some(Ok(seed)) => args.seed = seed,
                _ => log::warn!("--seed needs an integer; keeping {}", args.seed),
            },
            "--ticks" => match iter.next().map(|v| v.parse()) {
                Some(Ok(ticks)) => args.ticks = ticks,
                _ => log::warn!("--ticks needs an integer; keeping {}", args.ticks),
            },
            path => args.settings = Settings::load_or_default(path),
        }
    }
    args
}

/// Aim at the nearest asteroid, shoot it, and reel in any artifact
fn pilot(world: &WorldState) -> TickInput {
    let player = &world.player;
    let mut input = TickInput {
        thrust: if player.fuel_low() { 0.0 } else { 0.3 },
        tractor: true,
        ..Default::default()
    };

    let nearest = world
        .asteroids
        .iter()
        .min_by(|a, b| {
            let da = a.body.pos.distance_squared(player.body.pos);
            let db = b.body.pos.distance_squared(player.body.pos);
            da.total_cmp(&db)
        });
    if let Some(target) = nearest {
        let want = heading_of(target.body.pos - player.body.pos);
        let delta = normalize_angle(want - player.body.rotation);
        input.left = delta < -0.05;
        input.right = delta > 0.05;
        input.fire = delta.abs() < 0.2 && !target.is_artifact();
        input.fire_missile = player.visible_missiles() > 0 && !target.is_artifact();
    }
    input
}

fn log_event(event: &SimEvent) {
    match event {
        SimEvent::BulletFired { .. } => log::trace!("{event:?}"),
        SimEvent::TractorPhaseChanged { .. } | SimEvent::AsteroidFragmented { .. } => {
            log::debug!("{event:?}")
        }
        _ => log::info!("{event:?}"),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    let args = parse_args();
    log::info!("Flipit (headless) starting, seed {}", args.seed);

    let mut world = WorldState::new(args.seed, args.settings);
    let mut now_ms = 0.0;
    let mut accumulator = 0.0;

    while world.time_ticks < args.ticks && !world.game_over {
        now_ms += FRAME_MS;
        accumulator += FRAME_MS;

        let mut substeps = 0;
        while accumulator >= TICK_MS && substeps < MAX_SUBSTEPS {
            let input = pilot(&world);
            tick(&mut world, &input, now_ms, TICK_MS);
            for event in world.drain_events() {
                log_event(&event);
            }
            accumulator -= TICK_MS;
            substeps += 1;
        }
    }

    log::info!(
        "Finished after {} ticks: stage {}, score {}, flipits {}, lives {}",
        world.time_ticks,
        world.stage,
        world.score,
        world.flipits,
        world.lives
    );
    match serde_json::to_string_pretty(&world) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to serialize final state: {e}"),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts embed the library directly on wasm
}
