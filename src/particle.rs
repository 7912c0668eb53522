use glam::Vec2;
use rand::Rng;

/// Logical size of the simulation area, in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when both extents are positive and finite
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A single point particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Always > 0; used for drawing and wall collision
    pub radius: f32,
    /// Display hue in degrees, opaque to the simulation
    pub hue: f32,
}

impl Particle {
    pub fn new(position: Vec2, velocity: Vec2, radius: f32, hue: f32) -> Self {
        debug_assert!(radius > 0.0);
        Self {
            position,
            velocity,
            radius,
            hue,
        }
    }
}

/// Ordered particle storage. Indices are dense and stable for the duration
/// of a frame; growing appends and shrinking truncates from the end.
#[derive(Debug, Clone, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Grow or shrink to exactly `target` particles.
    ///
    /// New particles get a uniform position inside `bounds` and a velocity in
    /// [-speed/2, speed/2] on each axis. On a degenerate bounds they spawn at
    /// the origin.
    pub fn reserve<R: Rng + ?Sized>(&mut self, target: usize, bounds: Bounds, speed: f32, rng: &mut R) {
        if self.particles.len() >= target {
            self.particles.truncate(target);
            return;
        }

        self.particles.reserve(target - self.particles.len());
        let half_speed = speed.max(0.0) * 0.5;
        while self.particles.len() < target {
            let position = if bounds.is_valid() {
                Vec2::new(rng.gen_range(0.0..bounds.width), rng.gen_range(0.0..bounds.height))
            } else {
                Vec2::ZERO
            };
            let velocity = Vec2::new(
                symmetric_sample(rng, half_speed),
                symmetric_sample(rng, half_speed),
            );
            let radius = rng.gen_range(1.5..3.0);
            let hue = rng.gen_range(200.0..300.0);
            self.particles.push(Particle::new(position, velocity, radius, hue));
        }
    }

    /// Append `count` particles at (x, y) with velocity uniform in
    /// [-speed_range, speed_range] on both axes
    pub fn spawn_burst<R: Rng + ?Sized>(&mut self, x: f32, y: f32, count: usize, speed_range: f32, rng: &mut R) {
        let range = speed_range.max(0.0);
        let origin = Vec2::new(x, y);
        self.particles.reserve(count);
        for _ in 0..count {
            let velocity = Vec2::new(symmetric_sample(rng, range), symmetric_sample(rng, range));
            let radius = rng.gen_range(1.5..3.5);
            let hue = rng.gen_range(200.0..300.0);
            self.particles.push(Particle::new(origin, velocity, radius, hue));
        }
    }

    /// Index of the particle closest to (x, y) if it lies within `max_distance`.
    /// Ties go to the lowest index.
    pub fn select_nearest(&self, x: f32, y: f32, max_distance: f32) -> Option<usize> {
        if !(max_distance >= 0.0) {
            return None;
        }
        let target = Vec2::new(x, y);
        let max_dist_sq = max_distance * max_distance;

        let mut best: Option<(usize, f32)> = None;
        for (i, p) in self.particles.iter().enumerate() {
            let dist_sq = p.position.distance_squared(target);
            if dist_sq > max_dist_sq {
                continue;
            }
            match best {
                Some((_, best_sq)) if dist_sq >= best_sq => {}
                _ => best = Some((i, dist_sq)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Uniform sample in [-range, range]; zero when the range is empty
fn symmetric_sample<R: Rng + ?Sized>(rng: &mut R, range: f32) -> f32 {
    if range > 0.0 {
        rng.gen_range(-range..=range)
    } else {
        0.0
    }
}
