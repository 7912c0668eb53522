//! Proximity link enumeration over a [`SpatialIndex`].

use crate::error::{Result, SimError};
use crate::particle::Particle;
use crate::spatial::SpatialIndex;

/// Neighbor cells scanned from each cell, besides the cell itself.
/// Right, lower-right, below, lower-left: together with the same-cell pass this
/// sees every unordered pair of adjacent cells exactly once.
const HALF_NEIGHBORHOOD: [(isize, isize); 4] = [(1, 0), (1, 1), (0, 1), (-1, 1)];

/// A linked pair of particles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub a: usize,
    pub b: usize,
    pub distance: f32,
    pub radius: f32,
}

impl Link {
    /// Line fade factor in (0, 1]: 1 at zero distance, 0 at the link radius
    pub fn strength(&self) -> f32 {
        1.0 - self.distance / self.radius
    }
}

/// Visit every unordered pair closer than `radius`, exactly once.
///
/// Order is grid-scan order (row-major over cells, then bucket order, then
/// neighbor offset order). It is deterministic but not sorted by distance.
/// `radius` must not exceed the index cell size, otherwise pairs two cells
/// apart would be missed.
pub fn for_each_pair_within<F>(
    index: &SpatialIndex,
    particles: &[Particle],
    radius: f32,
    mut visit: F,
) -> Result<()>
where
    F: FnMut(usize, usize, f32),
{
    if !(radius.is_finite() && radius > 0.0) {
        return Err(SimError::invalid(format!("link radius must be positive, got {}", radius)));
    }
    if radius > index.cell_size() {
        return Err(SimError::invalid(format!(
            "link radius {} exceeds grid cell size {}",
            radius,
            index.cell_size()
        )));
    }

    let radius_sq = radius * radius;
    let mut check = |i: usize, j: usize| {
        let (Some(a), Some(b)) = (particles.get(i), particles.get(j)) else {
            return;
        };
        let dist_sq = a.position.distance_squared(b.position);
        if dist_sq < radius_sq {
            visit(i, j, dist_sq.sqrt());
        }
    };

    for (cx, cy, bucket) in index.occupied_cells() {
        // Same cell: each pair once, later bucket entry second
        for (k, &i) in bucket.iter().enumerate() {
            for &j in &bucket[k + 1..] {
                check(i, j);
            }
        }

        for (dx, dy) in HALF_NEIGHBORHOOD {
            let (Some(nx), Some(ny)) = (cx.checked_add_signed(dx), cy.checked_add_signed(dy)) else {
                continue;
            };
            let other = index.bucket(nx, ny);
            if other.is_empty() {
                continue;
            }
            for &i in bucket {
                for &j in other {
                    check(i, j);
                }
            }
        }
    }

    Ok(())
}

/// All links within `radius`, in enumeration order
pub fn collect_links(index: &SpatialIndex, particles: &[Particle], radius: f32) -> Result<Vec<Link>> {
    let mut links = Vec::new();
    for_each_pair_within(index, particles, radius, |a, b, distance| {
        links.push(Link { a, b, distance, radius });
    })?;
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Bounds;
    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn particles_at(positions: &[(f32, f32)]) -> Vec<Particle> {
        positions
            .iter()
            .map(|&(x, y)| Particle::new(Vec2::new(x, y), Vec2::ZERO, 2.0, 200.0))
            .collect()
    }

    fn unordered(a: usize, b: usize) -> (usize, usize) {
        (a.min(b), a.max(b))
    }

    fn brute_force(particles: &[Particle], radius: f32) -> HashSet<(usize, usize)> {
        let mut pairs = HashSet::new();
        for i in 0..particles.len() {
            for j in (i + 1)..particles.len() {
                if particles[i].position.distance_squared(particles[j].position) < radius * radius {
                    pairs.insert((i, j));
                }
            }
        }
        pairs
    }

    fn grid_pairs(particles: &[Particle], radius: f32, bounds: Bounds) -> Vec<(usize, usize)> {
        let index = SpatialIndex::build(particles, radius, bounds).unwrap();
        let mut pairs = Vec::new();
        for_each_pair_within(&index, particles, radius, |i, j, _| pairs.push(unordered(i, j))).unwrap();
        pairs
    }

    #[test]
    fn test_three_particle_scenario() {
        let particles = particles_at(&[(0.0, 0.0), (5.0, 0.0), (200.0, 0.0)]);
        let pairs = grid_pairs(&particles, 10.0, Bounds::new(400.0, 100.0));
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_widened_grid_still_finds_every_pair() {
        let mut rng = StdRng::seed_from_u64(8);
        let bounds = Bounds::new(2000.0, 2000.0);
        let particles: Vec<Particle> = (0..400)
            .map(|_| {
                Particle::new(
                    Vec2::new(rng.gen_range(0.0..20.0), rng.gen_range(0.0..20.0)),
                    Vec2::ZERO,
                    2.0,
                    200.0,
                )
            })
            .collect();
        let radius = 1.0;
        let index = SpatialIndex::build(&particles, radius, bounds).unwrap();
        assert!(index.cell_size() > radius);

        let mut pairs = Vec::new();
        for_each_pair_within(&index, &particles, radius, |i, j, _| pairs.push(unordered(i, j))).unwrap();
        let expected = brute_force(&particles, radius);
        assert!(!expected.is_empty());
        assert_eq!(pairs.len(), expected.len());
        assert_eq!(pairs.into_iter().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn test_matches_brute_force_on_random_layouts() {
        let mut rng = StdRng::seed_from_u64(42);
        for trial in 0..20 {
            let bounds = Bounds::new(rng.gen_range(50.0..900.0), rng.gen_range(50.0..700.0));
            let radius = rng.gen_range(10.0..120.0);
            let count = rng.gen_range(0..300);
            let particles: Vec<Particle> = (0..count)
                .map(|_| {
                    Particle::new(
                        Vec2::new(rng.gen_range(0.0..bounds.width), rng.gen_range(0.0..bounds.height)),
                        Vec2::ZERO,
                        2.0,
                        200.0,
                    )
                })
                .collect();

            let pairs = grid_pairs(&particles, radius, bounds);
            let unique: HashSet<(usize, usize)> = pairs.iter().copied().collect();

            assert_eq!(unique.len(), pairs.len(), "duplicate pair in trial {}", trial);
            assert!(pairs.iter().all(|&(a, b)| a != b), "self pair in trial {}", trial);
            assert_eq!(unique, brute_force(&particles, radius), "trial {}", trial);
        }
    }

    #[test]
    fn test_dense_cluster_in_one_cell() {
        let particles = particles_at(&[(1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (1.0, 2.0)]);
        let pairs = grid_pairs(&particles, 50.0, Bounds::new(100.0, 100.0));
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_pairs_across_every_neighbor_direction() {
        // Center particle in cell (1, 1); one neighbor in each of the eight surrounding cells
        let particles = particles_at(&[
            (15.0, 15.0),
            (9.0, 9.0),
            (15.0, 9.0),
            (21.0, 9.0),
            (9.0, 15.0),
            (21.0, 15.0),
            (9.0, 21.0),
            (15.0, 21.0),
            (21.0, 21.0),
        ]);
        let pairs: HashSet<(usize, usize)> = grid_pairs(&particles, 10.0, Bounds::new(30.0, 30.0))
            .into_iter()
            .collect();
        for j in 1..9 {
            assert!(pairs.contains(&(0, j)), "missing link to {}", j);
        }
        assert_eq!(pairs, brute_force(&particles, 10.0));
    }

    #[test]
    fn test_particles_outside_bounds_still_link() {
        let particles = particles_at(&[(-4.0, 50.0), (3.0, 50.0), (104.0, 50.0), (99.0, 50.0)]);
        let pairs: HashSet<(usize, usize)> = grid_pairs(&particles, 10.0, Bounds::new(100.0, 100.0))
            .into_iter()
            .collect();
        assert_eq!(pairs, brute_force(&particles, 10.0));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_exact_radius_is_not_linked() {
        let particles = particles_at(&[(0.0, 0.0), (10.0, 0.0)]);
        assert!(grid_pairs(&particles, 10.0, Bounds::new(100.0, 100.0)).is_empty());
    }

    #[test]
    fn test_reports_distance_and_strength() {
        let particles = particles_at(&[(10.0, 10.0), (13.0, 14.0)]);
        let index = SpatialIndex::build(&particles, 20.0, Bounds::new(100.0, 100.0)).unwrap();
        let links = collect_links(&index, &particles, 20.0).unwrap();

        assert_eq!(links.len(), 1);
        assert!((links[0].distance - 5.0).abs() < 1e-5);
        assert!((links[0].strength() - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_radius_larger_than_cell_is_rejected() {
        let particles = particles_at(&[(0.0, 0.0)]);
        let index = SpatialIndex::build(&particles, 10.0, Bounds::new(100.0, 100.0)).unwrap();
        let result = for_each_pair_within(&index, &particles, 25.0, |_, _, _| {});
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));

        let result = for_each_pair_within(&index, &particles, 0.0, |_, _, _| {});
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_smaller_radius_than_cell_is_complete() {
        let mut rng = StdRng::seed_from_u64(5);
        let particles: Vec<Particle> = (0..250)
            .map(|_| {
                Particle::new(
                    Vec2::new(rng.gen_range(0.0..400.0), rng.gen_range(0.0..400.0)),
                    Vec2::ZERO,
                    2.0,
                    200.0,
                )
            })
            .collect();
        let index = SpatialIndex::build(&particles, 50.0, Bounds::new(400.0, 400.0)).unwrap();
        let found: HashSet<(usize, usize)> = collect_links(&index, &particles, 30.0)
            .unwrap()
            .into_iter()
            .map(|l| unordered(l.a, l.b))
            .collect();
        assert_eq!(found, brute_force(&particles, 30.0));
    }
}
