use bevy::prelude::*;

use crate::camera::CameraRig;
use crate::components::PlayerIntent;
use crate::config::{load_sim_config, SimConfig};
use crate::events::SimEvent;
use crate::level::demo_world;
use crate::world::SimWorld;

/// Simulation output forwarded to presentation systems.
#[derive(Event, Clone, Debug, PartialEq)]
pub struct PresentationEvent(pub SimEvent);

/// Runs the demo level at the fixed timestep. Presentation reads
/// `PresentationEvent`s and the `CameraRig`; input writes `PlayerIntent`.
#[derive(Default)]
pub struct SimulationPlugin {
    pub config: Option<SimConfig>,
}

impl SimulationPlugin {
    pub fn with_config(config: SimConfig) -> Self {
        Self {
            config: Some(config),
        }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = self.config.clone().unwrap_or_else(load_sim_config);
        let rig = CameraRig::new(config.view_size(), config.seed);
        let world = demo_world(config.clone());
        app.insert_resource(config)
            .insert_resource(world)
            .insert_resource(rig)
            .init_resource::<PlayerIntent>()
            .add_event::<PresentationEvent>()
            .add_systems(FixedUpdate, step_simulation);
    }
}

pub fn step_simulation(
    time: Res<Time>,
    intent: Res<PlayerIntent>,
    mut world: ResMut<SimWorld>,
    mut rig: ResMut<CameraRig>,
    mut writer: EventWriter<PresentationEvent>,
) {
    world.tick(time.delta_secs(), &intent);
    let events = world.drain_events();
    rig.consume(&events);
    let follow = world.player().pos();
    rig.update(time.delta_secs(), follow);
    world.set_view_center(rig.center());
    for event in events {
        writer.send(PresentationEvent(event));
    }
}
