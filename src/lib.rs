pub mod actor;
pub mod ai;
pub mod animation;
pub mod camera;
pub mod combat;
pub mod components;
pub mod config;
pub mod events;
pub mod level;
pub mod physics_core;
pub mod plugin;
pub mod tilemap;
pub mod weapon;
pub mod world;

pub use camera::CameraRig;
pub use components::{ActorId, PlayerIntent, TileType};
pub use config::{load_sim_config, SimConfig};
pub use events::{EventRecord, SimEvent};
pub use level::{demo_level, demo_world, Level};
pub use plugin::{PresentationEvent, SimulationPlugin};
pub use world::{SimWorld, PLAYER};
