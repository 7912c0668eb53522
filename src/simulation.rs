use crate::config::ConfigPatch;
use crate::error::Result;
use crate::links::{self, Link};
use crate::particle::{Bounds, Particle, ParticleStore};
use crate::presets::Preset;
use crate::settings::{BoundaryPolicy, InteractionMode, SimulationConfig, INTERACTION_EPSILON_SQ};
use crate::spatial::SpatialIndex;
use glam::Vec2;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Largest time step a driver should pass to [`Simulation::advance`].
/// Clamping is the caller's job; the step itself does not reclamp.
pub const MAX_DT: f32 = 1.0 / 30.0;

/// Velocity gain per unit of pointer displacement while dragging a particle
pub const DRAG_GAIN: f32 = 20.0;

/// Wind phase advance in radians per second
const WIND_RATE: f32 = 0.4;

/// Pointer state for one frame, supplied by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub position: Vec2,
    /// Position on the previous frame
    pub previous: Vec2,
    pub down: bool,
    /// Particle currently being pulled by the pointer
    pub dragging: Option<usize>,
    /// False when the pointer is outside the canvas; no interaction force then
    pub present: bool,
}

impl PointerState {
    pub fn at(x: f32, y: f32) -> Self {
        let position = Vec2::new(x, y);
        Self {
            position,
            previous: position,
            down: false,
            dragging: None,
            present: true,
        }
    }

    /// Pointer displacement since the previous frame
    pub fn displacement(&self) -> Vec2 {
        self.position - self.previous
    }

    /// Record a new position, keeping the old one as `previous`
    pub fn move_to(&mut self, x: f32, y: f32) {
        self.previous = self.position;
        self.position = Vec2::new(x, y);
        self.present = true;
    }

    /// Call after each frame so a still pointer reports zero displacement
    pub fn settle(&mut self) {
        self.previous = self.position;
    }
}

/// Slowly rotating wind. The phase advances by a fixed angular rate, which
/// gives smooth gusts rather than random noise.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindState {
    pub phase: f32,
}

impl WindState {
    pub fn advance(&mut self, dt: f32) {
        self.phase += dt * WIND_RATE;
    }

    /// Wind acceleration for the current phase
    pub fn vector(&self, magnitude: f32) -> Vec2 {
        Vec2::new(
            self.phase.cos() * magnitude,
            (self.phase * 1.3).sin() * magnitude * 0.25,
        )
    }
}

/// Integrate every particle once.
///
/// Per particle, in order: gravity + wind, pointer interaction (k / d²),
/// pointer drag, `v += a·dt`, damping, speed cap, `p += v·dt`, boundary.
///
/// Damping is applied once per call regardless of `dt`, so its strength
/// depends on frame rate. Callers must clamp `dt` to [`MAX_DT`]. A
/// non-positive `dt` or a zero-area `bounds` leaves every particle untouched.
pub fn advance(
    particles: &mut [Particle],
    config: &SimulationConfig,
    dt: f32,
    bounds: Bounds,
    pointer: &PointerState,
    wind: &mut WindState,
) {
    if !(dt.is_finite() && dt > 0.0) || !bounds.is_valid() {
        return;
    }

    wind.advance(dt);
    let base_accel = Vec2::new(0.0, config.gravity) + wind.vector(config.wind);

    let interaction_sign = if pointer.present { config.mode.sign() } else { 0.0 };
    let interaction_radius_sq = config.interaction_radius_sq();
    let drag_accel = pointer.displacement() * DRAG_GAIN;

    for (i, p) in particles.iter_mut().enumerate() {
        let mut accel = base_accel;

        if config.mode != InteractionMode::None && interaction_sign != 0.0 {
            let to_source = pointer.position - p.position;
            let dist_sq = to_source.length_squared();
            if dist_sq > INTERACTION_EPSILON_SQ && dist_sq < interaction_radius_sq {
                let k = interaction_sign * config.interaction_strength / dist_sq;
                accel += to_source / dist_sq.sqrt() * k;
            }
        }

        if pointer.down && pointer.dragging == Some(i) {
            accel += drag_accel;
        }

        p.velocity += accel * dt;
        p.velocity *= config.damping;

        if let Some(cap) = config.max_speed {
            let speed_sq = p.velocity.length_squared();
            if speed_sq > cap * cap {
                p.velocity *= cap / speed_sq.sqrt();
            }
        }

        p.position += p.velocity * dt;

        match config.boundary {
            BoundaryPolicy::Wrap => {
                p.position.x = wrap(p.position.x, bounds.width);
                p.position.y = wrap(p.position.y, bounds.height);
            }
            BoundaryPolicy::Bounce => {
                (p.position.x, p.velocity.x) =
                    bounce(p.position.x, p.velocity.x, p.radius, bounds.width, config.restitution);
                (p.position.y, p.velocity.y) =
                    bounce(p.position.y, p.velocity.y, p.radius, bounds.height, config.restitution);
            }
        }
    }
}

/// Wrap into [0, extent)
fn wrap(value: f32, extent: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// Clamp into [radius, extent - radius] and reflect the velocity away from the wall
fn bounce(position: f32, velocity: f32, radius: f32, extent: f32, restitution: f32) -> (f32, f32) {
    let lo = radius.min(extent * 0.5);
    let hi = (extent - radius).max(lo);
    if position < lo {
        (lo, velocity.abs() * restitution)
    } else if position > hi {
        (hi, -velocity.abs() * restitution)
    } else {
        (position, velocity)
    }
}

/// Simulation state: particles, the configuration snapshot they run under,
/// and the spatial index rebuilt after each step.
pub struct Simulation {
    config: SimulationConfig,
    store: ParticleStore,
    index: SpatialIndex,
    bounds: Bounds,
    wind: WindState,
    rng: StdRng,
    pub paused: bool,
    /// Frames integrated since creation
    pub frame: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig, bounds: Bounds) -> Result<Self> {
        Self::with_rng(config, bounds, StdRng::from_entropy())
    }

    /// Deterministic construction for reproducible runs
    pub fn with_seed(config: SimulationConfig, bounds: Bounds, seed: u64) -> Result<Self> {
        Self::with_rng(config, bounds, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, bounds: Bounds, mut rng: StdRng) -> Result<Self> {
        config.validate()?;

        let mut store = ParticleStore::new();
        store.reserve(config.count, bounds, config.speed, &mut rng);
        let index = SpatialIndex::build(store.as_slice(), config.link_radius, bounds)?;

        info!(
            "simulation created: {} particles, {:.0}x{:.0} bounds",
            store.len(),
            bounds.width,
            bounds.height
        );

        Ok(Self {
            config,
            store,
            index,
            bounds,
            wind: WindState::default(),
            rng,
            paused: false,
            frame: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.store
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn wind(&self) -> WindState {
        self.wind
    }

    /// Replace the configuration. Validation happens first; on error nothing
    /// changes. On success the population is resized to the new count and the
    /// index is rebuilt with the new link radius.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<()> {
        if let Err(e) = config.validate() {
            warn!("rejected configuration: {}", e);
            return Err(e);
        }
        let index = SpatialIndex::build(self.store.as_slice(), config.link_radius, self.bounds)?;

        if config.count != self.config.count {
            debug!("population {} -> {}", self.store.len(), config.count);
        }
        self.config = config;
        self.index = index;
        self.reserve(self.config.count);
        info!(
            "configuration applied: mode={}, link radius={:.0}, boundary={}",
            self.config.mode.name(),
            self.config.link_radius,
            self.config.boundary.name()
        );
        Ok(())
    }

    /// Resize the simulation area. Particles stay where they are; the next
    /// step wraps or bounces them back inside.
    pub fn resize(&mut self, bounds: Bounds) {
        if bounds != self.bounds {
            debug!("bounds {:?} -> {:?}", self.bounds, bounds);
            self.bounds = bounds;
            self.rebuild_index();
        }
    }

    /// Grow or shrink the population to `target`
    pub fn reserve(&mut self, target: usize) {
        self.store.reserve(target, self.bounds, self.config.speed, &mut self.rng);
        self.config.count = self.store.len();
        self.rebuild_index();
    }

    /// Spawn a burst of `count` particles at (x, y)
    pub fn spawn_burst(&mut self, x: f32, y: f32, count: usize, speed_range: f32) {
        self.store.spawn_burst(x, y, count, speed_range, &mut self.rng);
        self.config.count = self.store.len();
        self.rebuild_index();
        debug!("burst of {} at ({:.0}, {:.0})", count, x, y);
    }

    pub fn select_nearest(&self, x: f32, y: f32, max_distance: f32) -> Option<usize> {
        self.store.select_nearest(x, y, max_distance)
    }

    /// Remove every particle
    pub fn clear(&mut self) {
        self.store.clear();
        self.config.count = 0;
        self.rebuild_index();
    }

    /// Advance one frame under `bounds` (the current canvas size) and rebuild
    /// the spatial index. The configuration is read once for the whole frame.
    /// No-op while paused.
    pub fn advance(&mut self, dt: f32, bounds: Bounds, pointer: &PointerState) {
        self.resize(bounds);
        if self.paused {
            return;
        }
        advance(
            self.store.as_mut_slice(),
            &self.config,
            dt,
            self.bounds,
            pointer,
            &mut self.wind,
        );
        self.rebuild_index();
        self.frame += 1;
    }

    /// Visit every linked pair for the current frame
    pub fn for_each_link<F>(&self, visit: F)
    where
        F: FnMut(usize, usize, f32),
    {
        // The index is always built with the link radius as cell size
        if let Err(e) = links::for_each_pair_within(
            &self.index,
            self.store.as_slice(),
            self.config.link_radius,
            visit,
        ) {
            warn!("link enumeration skipped: {}", e);
        }
    }

    pub fn links(&self) -> Vec<Link> {
        let mut out = Vec::new();
        let radius = self.config.link_radius;
        self.for_each_link(|a, b, distance| out.push(Link { a, b, distance, radius }));
        out
    }

    /// Apply a partial configuration on top of the current one
    pub fn apply_patch(&mut self, patch: &ConfigPatch) -> Result<()> {
        let config = patch.apply(&self.config)?;
        self.set_config(config)
    }

    pub fn apply_preset(&mut self, preset: &Preset) -> Result<()> {
        self.apply_patch(&preset.patch)?;
        info!("preset applied: {}", preset.name);
        Ok(())
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    fn rebuild_index(&mut self) {
        // link_radius is validated positive, so this cannot fail
        if let Err(e) = self
            .index
            .rebuild(self.store.as_slice(), self.config.link_radius, self.bounds)
        {
            warn!("spatial index rebuild failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn still_config() -> SimulationConfig {
        SimulationConfig {
            count: 0,
            gravity: 0.0,
            wind: 0.0,
            mode: InteractionMode::None,
            damping: 1.0,
            ..Default::default()
        }
    }

    fn one_particle(x: f32, y: f32, vx: f32, vy: f32) -> Vec<Particle> {
        vec![Particle::new(Vec2::new(x, y), Vec2::new(vx, vy), 2.0, 200.0)]
    }

    fn step(particles: &mut [Particle], config: &SimulationConfig, dt: f32, bounds: Bounds) {
        let mut wind = WindState::default();
        advance(particles, config, dt, bounds, &PointerState::default(), &mut wind);
    }

    #[test]
    fn test_wrap_right_edge_reenters_left() {
        let bounds = Bounds::new(200.0, 100.0);
        let mut particles = one_particle(200.0 - 0.001, 50.0, 30.0, 0.0);
        step(&mut particles, &still_config(), MAX_DT, bounds);

        let x = particles[0].position.x;
        assert!(x >= 0.0 && x < 200.0, "x = {}", x);
        assert!(x < 2.0, "x = {}", x);
        assert_eq!(particles[0].position.y, 50.0);
    }

    #[test]
    fn test_wrap_negative_coordinates() {
        let bounds = Bounds::new(100.0, 100.0);
        let mut particles = one_particle(0.5, 0.5, -60.0, -60.0);
        step(&mut particles, &still_config(), 0.1, bounds);

        let p = particles[0].position;
        assert!((p.x - 94.5).abs() < 1e-3);
        assert!((p.y - 94.5).abs() < 1e-3);
    }

    #[test]
    fn test_wrap_never_reaches_extent() {
        assert_eq!(wrap(-1e-9, 100.0), 0.0);
        assert!(wrap(-1e-9, 100.0) < 100.0);
        assert_eq!(wrap(100.0, 100.0), 0.0);
        assert_eq!(wrap(f32::NAN, 100.0), 0.0);
    }

    #[test]
    fn test_bounce_reverses_velocity_at_left_wall() {
        let bounds = Bounds::new(100.0, 100.0);
        let config = SimulationConfig {
            boundary: BoundaryPolicy::Bounce,
            restitution: 0.8,
            ..still_config()
        };
        let mut particles = one_particle(3.0, 50.0, -120.0, 0.0);
        step(&mut particles, &config, MAX_DT, bounds);

        let p = particles[0];
        assert!(p.velocity.x > 0.0);
        assert!((p.velocity.x - 96.0).abs() < 1e-3);
        assert!(p.position.x >= p.radius);
    }

    #[test]
    fn test_bounce_clamps_far_walls() {
        let bounds = Bounds::new(100.0, 80.0);
        let config = SimulationConfig {
            boundary: BoundaryPolicy::Bounce,
            restitution: 1.0,
            ..still_config()
        };
        let mut particles = one_particle(99.0, 79.0, 90.0, 90.0);
        step(&mut particles, &config, MAX_DT, bounds);

        let p = particles[0];
        assert_eq!(p.position.x, 98.0);
        assert_eq!(p.position.y, 78.0);
        assert_eq!(p.velocity, Vec2::new(-90.0, -90.0));
    }

    #[test]
    fn test_damping_convergence() {
        let bounds = Bounds::new(10_000.0, 10_000.0);
        let config = SimulationConfig { damping: 0.9, ..still_config() };
        let mut particles = one_particle(5000.0, 5000.0, 30.0, -40.0);
        let initial = particles[0].velocity.length();

        for k in 1..=25 {
            step(&mut particles, &config, 0.016, bounds);
            let expected = initial * 0.9_f32.powi(k);
            let actual = particles[0].velocity.length();
            assert!((actual - expected).abs() < 1e-3 * initial, "frame {}: {} vs {}", k, actual, expected);
        }
    }

    #[test]
    fn test_gravity_accelerates_down() {
        let config = SimulationConfig { gravity: 60.0, ..still_config() };
        let mut particles = one_particle(50.0, 10.0, 0.0, 0.0);
        step(&mut particles, &config, 0.5, Bounds::new(100.0, 100.0));
        assert!((particles[0].velocity.y - 30.0).abs() < 1e-4);
        assert!((particles[0].position.y - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_speed_cap_preserves_direction() {
        let config = SimulationConfig { max_speed: Some(5.0), ..still_config() };
        let mut particles = one_particle(50.0, 50.0, 30.0, 40.0);
        step(&mut particles, &config, 0.01, Bounds::new(100.0, 100.0));

        let v = particles[0].velocity;
        assert!((v.length() - 5.0).abs() < 1e-4);
        assert!((v.x / v.y - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_attract_and_repel() {
        let bounds = Bounds::new(400.0, 400.0);
        let pointer = PointerState::at(200.0, 200.0);

        for (mode, expect_toward) in [(InteractionMode::Attract, true), (InteractionMode::Repel, false)] {
            let config = SimulationConfig { mode, ..still_config() };
            let mut particles = one_particle(150.0, 200.0, 0.0, 0.0);
            let mut wind = WindState::default();
            advance(&mut particles, &config, 0.01, bounds, &pointer, &mut wind);

            // k / d² = 9000 / 2500 = 3.6
            let vx = particles[0].velocity.x;
            assert!((vx.abs() - 0.036).abs() < 1e-5);
            assert_eq!(vx > 0.0, expect_toward);
        }
    }

    #[test]
    fn test_interaction_skips_close_and_far_particles() {
        let bounds = Bounds::new(1000.0, 1000.0);
        let config = SimulationConfig { mode: InteractionMode::Repel, ..still_config() };
        let pointer = PointerState::at(500.0, 500.0);
        // 2 units away (inside epsilon) and 200 units away (beyond 100·sqrt(2.5))
        let mut particles = vec![
            Particle::new(Vec2::new(502.0, 500.0), Vec2::ZERO, 2.0, 200.0),
            Particle::new(Vec2::new(700.0, 500.0), Vec2::ZERO, 2.0, 200.0),
        ];
        let mut wind = WindState::default();
        advance(&mut particles, &config, 0.01, bounds, &pointer, &mut wind);

        assert_eq!(particles[0].velocity, Vec2::ZERO);
        assert_eq!(particles[1].velocity, Vec2::ZERO);
    }

    #[test]
    fn test_drag_only_moves_dragged_particle() {
        let bounds = Bounds::new(1000.0, 1000.0);
        let mut pointer = PointerState::at(100.0, 100.0);
        pointer.move_to(110.0, 100.0);
        pointer.down = true;
        pointer.dragging = Some(1);

        let mut particles = vec![
            Particle::new(Vec2::new(600.0, 600.0), Vec2::ZERO, 2.0, 200.0),
            Particle::new(Vec2::new(700.0, 700.0), Vec2::ZERO, 2.0, 200.0),
        ];
        let mut wind = WindState::default();
        advance(&mut particles, &still_config(), 0.01, bounds, &pointer, &mut wind);

        assert_eq!(particles[0].velocity, Vec2::ZERO);
        // 10 units displacement * 20 gain * 0.01 s
        assert!((particles[1].velocity.x - 2.0).abs() < 1e-5);
        assert_eq!(particles[1].velocity.y, 0.0);
    }

    #[test]
    fn test_wind_rotates_smoothly() {
        let mut wind = WindState::default();
        let start = wind.vector(40.0);
        assert_eq!(start, Vec2::new(40.0, 0.0));
        wind.advance(MAX_DT);
        let next = wind.vector(40.0);
        assert!((next - start).length() < 1.0);
    }

    #[test]
    fn test_wind_pushes_particles_along_current_phase() {
        let bounds = Bounds::new(10_000.0, 10_000.0);
        let config = SimulationConfig { wind: 120.0, ..still_config() };
        let dt = 0.02;
        let mut particles = vec![
            Particle::new(Vec2::new(5000.0, 5000.0), Vec2::ZERO, 2.0, 200.0),
            Particle::new(Vec2::new(3000.0, 4000.0), Vec2::ZERO, 2.0, 200.0),
        ];
        let mut wind = WindState::default();

        advance(&mut particles, &config, dt, bounds, &PointerState::default(), &mut wind);
        assert!((wind.phase - dt * WIND_RATE).abs() < 1e-7);
        let expected = WindState { phase: dt * WIND_RATE }.vector(120.0) * dt;
        for p in &particles {
            assert!((p.velocity - expected).length() < 1e-5, "{:?} vs {:?}", p.velocity, expected);
        }

        advance(&mut particles, &config, dt, bounds, &PointerState::default(), &mut wind);
        assert!((wind.phase - 2.0 * dt * WIND_RATE).abs() < 1e-7);
        let second = expected + WindState { phase: 2.0 * dt * WIND_RATE }.vector(120.0) * dt;
        assert!((particles[0].velocity - second).length() < 1e-5);
    }

    #[test]
    fn test_zero_area_bounds_freeze_motion() {
        let config = SimulationConfig { gravity: 100.0, ..still_config() };
        let mut particles = one_particle(5.0, 5.0, 10.0, 10.0);
        let before = particles.clone();
        step(&mut particles, &config, MAX_DT, Bounds::new(0.0, 300.0));
        assert_eq!(particles, before);

        step(&mut particles, &config, 0.0, Bounds::new(100.0, 100.0));
        assert_eq!(particles, before);
    }

    #[test]
    fn test_simulation_set_config_is_all_or_nothing() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut sim = Simulation::with_seed(SimulationConfig::default(), bounds, 1).unwrap();
        let before = sim.config().clone();

        let bad = SimulationConfig { damping: 1.5, count: 10, ..Default::default() };
        assert!(sim.set_config(bad).is_err());
        assert_eq!(sim.config(), &before);
        assert_eq!(sim.particles().len(), 600);

        let good = SimulationConfig { count: 50, link_radius: 60.0, ..Default::default() };
        sim.set_config(good).unwrap();
        assert_eq!(sim.particles().len(), 50);
        assert_eq!(sim.index().cell_size(), 60.0);
    }

    #[test]
    fn test_tiny_link_radius_is_rejected_without_allocating() {
        let bounds = Bounds::new(1600.0, 800.0);
        let tiny = SimulationConfig { link_radius: 0.001, count: 10, ..Default::default() };
        assert!(matches!(
            Simulation::with_seed(tiny.clone(), bounds, 1),
            Err(SimError::InvalidConfig(_))
        ));

        let mut sim = Simulation::with_seed(SimulationConfig::default(), bounds, 1).unwrap();
        assert!(sim.set_config(tiny).is_err());
        assert_eq!(sim.index().cell_size(), 100.0);

        let smallest = SimulationConfig { link_radius: 1.0, count: 10, ..Default::default() };
        sim.set_config(smallest).unwrap();
        sim.resize(Bounds::new(100_000.0, 100_000.0));
        assert!(sim.index().cols() * sim.index().rows() <= crate::spatial::MAX_CELLS);
        assert_eq!(sim.index().len(), 10);
    }

    #[test]
    fn test_simulation_advance_keeps_index_current() {
        let bounds = Bounds::new(640.0, 480.0);
        let mut sim = Simulation::with_seed(SimulationConfig::default(), bounds, 9).unwrap();
        let pointer = PointerState::at(320.0, 240.0);
        for _ in 0..30 {
            sim.advance(MAX_DT, bounds, &pointer);
        }
        assert_eq!(sim.frame, 30);
        assert_eq!(sim.index().len(), sim.particles().len());

        let expected = SpatialIndex::build(sim.particles().as_slice(), 100.0, bounds).unwrap();
        assert_eq!(sim.index(), &expected);

        for p in sim.particles().iter() {
            assert!(p.position.x >= 0.0 && p.position.x < 640.0);
            assert!(p.position.y >= 0.0 && p.position.y < 480.0);
        }
    }

    #[test]
    fn test_paused_simulation_does_not_move() {
        let bounds = Bounds::new(300.0, 300.0);
        let mut sim = Simulation::with_seed(SimulationConfig::default(), bounds, 2).unwrap();
        let before: Vec<Particle> = sim.particles().iter().copied().collect();
        sim.toggle_pause();
        sim.advance(MAX_DT, bounds, &PointerState::default());
        assert_eq!(sim.particles().as_slice(), before.as_slice());
        assert_eq!(sim.frame, 0);
    }

    #[test]
    fn test_burst_and_clear_track_count() {
        let bounds = Bounds::new(300.0, 300.0);
        let config = SimulationConfig { count: 10, ..Default::default() };
        let mut sim = Simulation::with_seed(config, bounds, 4).unwrap();

        sim.spawn_burst(150.0, 150.0, 30, 40.0);
        assert_eq!(sim.particles().len(), 40);
        assert_eq!(sim.config().count, 40);
        assert_eq!(sim.index().len(), 40);
        assert!(!sim.links().is_empty());

        sim.clear();
        assert!(sim.particles().is_empty());
        assert!(sim.links().is_empty());
    }

    #[test]
    fn test_apply_patch_rejects_negative_count() {
        let bounds = Bounds::new(300.0, 300.0);
        let mut sim = Simulation::with_seed(SimulationConfig::default(), bounds, 3).unwrap();
        let patch = ConfigPatch { count: Some(-4), gravity: Some(0.0), ..Default::default() };

        assert!(sim.apply_patch(&patch).is_err());
        assert_eq!(sim.config(), &SimulationConfig::default());
        assert_eq!(sim.particles().len(), 600);
    }

    #[test]
    fn test_patch_can_lift_preset_speed_cap() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut sim = Simulation::with_seed(SimulationConfig::default(), bounds, 4).unwrap();
        let presets = crate::presets::PresetManager::with_dir(None);
        sim.apply_preset(presets.find("Pinball").unwrap()).unwrap();
        assert_eq!(sim.config().max_speed, Some(400.0));

        let lift = ConfigPatch {
            max_speed: Some(None),
            ..Default::default()
        };
        sim.apply_patch(&lift).unwrap();
        assert_eq!(sim.config().max_speed, None);
        assert_eq!(sim.config().boundary, BoundaryPolicy::Bounce);
    }

    #[test]
    fn test_apply_preset_resizes_population() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut sim = Simulation::with_seed(SimulationConfig::default(), bounds, 3).unwrap();
        let presets = crate::presets::PresetManager::with_dir(None);
        let galaxy = presets.find("Galaxy").unwrap();

        sim.apply_preset(galaxy).unwrap();
        assert_eq!(sim.particles().len(), 700);
        assert_eq!(sim.config().mode, InteractionMode::Attract);
        assert_eq!(sim.index().cell_size(), 140.0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let bounds = Bounds::new(500.0, 400.0);
        let run = || {
            let mut sim = Simulation::with_seed(SimulationConfig::default(), bounds, 77).unwrap();
            let pointer = PointerState::at(250.0, 200.0);
            for _ in 0..20 {
                sim.advance(MAX_DT, bounds, &pointer);
            }
            sim.links()
        };
        assert_eq!(run(), run());
    }
}
