//! Spatial-grid particle simulation with proximity links.
//!
//! A population of point particles moves under gravity, a slowly rotating
//! wind and an optional pointer force. Every frame the pairs closer than the
//! link radius are found through a uniform grid whose cell size equals that
//! radius, so only the same and adjacent cells need to be searched.
//!
//! The crate draws nothing. A driver calls [`Simulation::advance`] once per
//! frame, then reads particles and [`Simulation::for_each_link`] to render.

pub mod config;
pub mod error;
pub mod links;
pub mod particle;
pub mod presets;
pub mod settings;
pub mod simulation;
pub mod spatial;

pub use config::{AppConfig, ConfigPatch};
pub use error::{Result, SimError};
pub use links::{collect_links, for_each_pair_within, Link};
pub use particle::{Bounds, Particle, ParticleStore};
pub use presets::{Preset, PresetManager};
pub use settings::{BoundaryPolicy, InteractionMode, SimulationConfig};
pub use simulation::{advance, PointerState, Simulation, WindState, MAX_DT};
pub use spatial::SpatialIndex;
