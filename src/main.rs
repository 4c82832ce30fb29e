use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use recoil::{demo_world, load_sim_config, CameraRig, PlayerIntent, SimConfig, SimulationPlugin};

const TICK_HZ: f64 = 60.0;

fn frames_arg(args: &[String]) -> Option<u64> {
    let pos = args.iter().position(|a| a == "--frames")?;
    match args.get(pos + 1).map(|s| s.parse::<u64>()) {
        Some(Ok(n)) => Some(n),
        _ => {
            eprintln!("[Recoil] --frames expects a tick count");
            std::process::exit(2);
        }
    }
}

/// Steps the demo level without an app loop and prints a JSON summary.
fn run_frames(config: SimConfig, frames: u64) {
    let dt = (1.0 / TICK_HZ) as f32;
    let mut rig = CameraRig::new(config.view_size(), config.seed);
    let mut world = demo_world(config);
    let intent = PlayerIntent::default();
    let mut events = 0usize;
    for _ in 0..frames {
        world.tick(dt, &intent);
        let drained = world.drain_events();
        events += drained.len();
        rig.consume(&drained);
        let follow = world.player().pos();
        rig.update(dt, follow);
        world.set_view_center(rig.center());
    }

    let alive = world.enemies().filter(|(_, e)| !e.is_dead()).count();
    let summary = serde_json::json!({
        "ticks": world.ticks,
        "enemies_alive": alive,
        "player_life": world.player().health.life,
        "player_dead": world.player().is_dead(),
        "tiles": world.grid.len(),
        "projectiles": world.projectiles.len(),
        "events": events,
    });
    println!("{summary}");
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let config = load_sim_config();

    if let Some(frames) = frames_arg(&args) {
        run_frames(config, frames);
        return;
    }

    println!("[Recoil] Starting headless simulation at {TICK_HZ} Hz");
    App::new()
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / TICK_HZ,
            ))),
            bevy::log::LogPlugin::default(),
        ))
        .insert_resource(Time::<Fixed>::from_hz(TICK_HZ))
        .add_plugins(SimulationPlugin::with_config(config))
        .run();
}
