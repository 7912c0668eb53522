use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Squared multiple of the link radius inside which the pointer force acts.
pub const INTERACTION_REACH_SQ: f32 = 2.5;

/// Pointer force is skipped closer than this squared distance (3 units).
pub const INTERACTION_EPSILON_SQ: f32 = 9.0;

/// Smallest accepted link radius, in world units
pub const MIN_LINK_RADIUS: f32 = 1.0;

/// How the pointer acts on nearby particles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    None,
    Attract,
    #[default]
    Repel,
}

impl InteractionMode {
    pub fn name(&self) -> &str {
        match self {
            InteractionMode::None => "None",
            InteractionMode::Attract => "Attract",
            InteractionMode::Repel => "Repel",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            InteractionMode::None => InteractionMode::Attract,
            InteractionMode::Attract => InteractionMode::Repel,
            InteractionMode::Repel => InteractionMode::None,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            InteractionMode::None => InteractionMode::Repel,
            InteractionMode::Attract => InteractionMode::None,
            InteractionMode::Repel => InteractionMode::Attract,
        }
    }

    /// +1 pulls toward the source, -1 pushes away, 0 disables the force
    pub fn sign(&self) -> f32 {
        match self {
            InteractionMode::None => 0.0,
            InteractionMode::Attract => 1.0,
            InteractionMode::Repel => -1.0,
        }
    }
}

/// Boundary policy - what happens when particles leave the bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Re-enter on the opposite side (toroidal)
    #[default]
    Wrap,
    /// Reflect off the walls, losing energy by the restitution factor
    Bounce,
}

impl BoundaryPolicy {
    pub fn name(&self) -> &str {
        match self {
            BoundaryPolicy::Wrap => "Wrap",
            BoundaryPolicy::Bounce => "Bounce",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            BoundaryPolicy::Wrap => BoundaryPolicy::Bounce,
            BoundaryPolicy::Bounce => BoundaryPolicy::Wrap,
        }
    }
}

/// All simulation settings consolidated into one value.
///
/// The simulation reads one snapshot per frame; changes are made by replacing
/// the whole value through [`crate::Simulation::set_config`], which validates
/// first so a bad value never reaches a running simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    // === Population ===
    /// Target particle count
    pub count: usize,
    /// Spawn velocity range; new particles get [-speed/2, speed/2] per axis
    pub speed: f32,

    // === Forces ===
    /// Maximum distance at which two particles are linked; also the grid cell size
    pub link_radius: f32,
    /// Vertical acceleration (positive = down)
    pub gravity: f32,
    /// Per-frame velocity multiplier (0, 1]
    pub damping: f32,
    /// Magnitude of the slowly rotating wind
    pub wind: f32,
    /// Pointer interaction mode
    pub mode: InteractionMode,
    /// Constant k of the k / d² pointer force
    pub interaction_strength: f32,
    /// Optional cap on velocity magnitude
    pub max_speed: Option<f32>,

    // === Boundary ===
    pub boundary: BoundaryPolicy,
    /// Fraction of the normal velocity kept after a bounce [0, 1]
    pub restitution: f32,

    // === Visual hints (opaque to the simulation) ===
    /// Trail/clear intensity (0, 1]
    pub trails: f32,
    /// Draw the spatial grid
    pub show_grid: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            count: 600,
            speed: 40.0,
            link_radius: 100.0,
            gravity: 60.0,
            damping: 0.985,
            wind: 40.0,
            mode: InteractionMode::default(),
            interaction_strength: 9000.0,
            max_speed: None,
            boundary: BoundaryPolicy::default(),
            restitution: 0.9,
            trails: 0.25,
            show_grid: false,
        }
    }
}

impl SimulationConfig {
    /// Check every field against its valid range
    pub fn validate(&self) -> Result<()> {
        if !(self.link_radius.is_finite() && self.link_radius >= MIN_LINK_RADIUS) {
            return Err(SimError::invalid(format!(
                "link radius must be at least {}, got {}",
                MIN_LINK_RADIUS,
                self.link_radius
            )));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(SimError::invalid(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        if !(self.wind.is_finite() && self.wind >= 0.0) {
            return Err(SimError::invalid(format!("wind must be >= 0, got {}", self.wind)));
        }
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(SimError::invalid(format!("speed must be >= 0, got {}", self.speed)));
        }
        if !self.gravity.is_finite() {
            return Err(SimError::invalid("gravity must be finite"));
        }
        if !(self.trails > 0.0 && self.trails <= 1.0) {
            return Err(SimError::invalid(format!(
                "trails must be in (0, 1], got {}",
                self.trails
            )));
        }
        if !(self.restitution >= 0.0 && self.restitution <= 1.0) {
            return Err(SimError::invalid(format!(
                "restitution must be in [0, 1], got {}",
                self.restitution
            )));
        }
        if !(self.interaction_strength.is_finite() && self.interaction_strength >= 0.0) {
            return Err(SimError::invalid(format!(
                "interaction strength must be >= 0, got {}",
                self.interaction_strength
            )));
        }
        if let Some(cap) = self.max_speed {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(SimError::invalid(format!("max speed must be positive, got {}", cap)));
            }
        }
        Ok(())
    }

    /// Squared radius around the pointer inside which the interaction force applies
    pub fn interaction_radius_sq(&self) -> f32 {
        self.link_radius * self.link_radius * INTERACTION_REACH_SQ
    }

    /// Flat key-value snapshot, keyed the same way as the JSON export
    pub fn to_flat(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(SimError::invalid(format!("unexpected config shape: {}", other))),
        }
    }

    // === UI adjusters (clamped to the slider ranges, so always valid) ===

    pub fn adjust_count(&mut self, delta: i32) {
        self.count = (self.count as i64 + delta as i64).clamp(0, 5000) as usize;
    }

    pub fn adjust_link_radius(&mut self, delta: f32) {
        self.link_radius = (self.link_radius + delta).clamp(20.0, 250.0);
    }

    pub fn adjust_gravity(&mut self, delta: f32) {
        self.gravity = (self.gravity + delta).clamp(-200.0, 200.0);
    }

    pub fn adjust_wind(&mut self, delta: f32) {
        self.wind = (self.wind + delta).clamp(0.0, 200.0);
    }

    pub fn adjust_damping(&mut self, delta: f32) {
        self.damping = (self.damping + delta).clamp(0.95, 1.0);
    }

    pub fn adjust_speed(&mut self, delta: f32) {
        self.speed = (self.speed + delta).clamp(0.0, 120.0);
    }

    pub fn adjust_trails(&mut self, delta: f32) {
        self.trails = (self.trails + delta).clamp(0.05, 1.0);
    }

    pub fn adjust_restitution(&mut self, delta: f32) {
        self.restitution = (self.restitution + delta).clamp(0.0, 1.0);
    }

    pub fn cycle_mode(&mut self) {
        self.mode = self.mode.next();
    }

    pub fn cycle_boundary(&mut self) {
        self.boundary = self.boundary.next();
    }
}
