//! Uniform spatial grid used to restrict neighbor search to adjacent cells.
//!
//! The grid is rebuilt from scratch every frame. Particles move every frame,
//! so incremental maintenance would not pay for itself at the population
//! sizes this crate targets (hundreds to low thousands). Far larger
//! populations will find the per-frame rebuild to be the scaling limit.

use crate::error::{Result, SimError};
use crate::particle::{Bounds, Particle};
use glam::Vec2;
use log::trace;

/// Upper bound on the number of grid cells. Past it the cell size grows
/// until the grid fits; a larger cell never loses a pair within the radius.
pub const MAX_CELLS: usize = 1 << 18;

/// Grid cell → particle indices
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialIndex {
    cell_size: f32,
    cols: usize,
    rows: usize,
    /// Row-major buckets: index = cy * cols + cx
    buckets: Vec<Vec<usize>>,
}

impl SpatialIndex {
    /// Build a fresh index over `particles`.
    ///
    /// Cell coordinates are clamped into the grid, so particles sitting on or
    /// past the far edge land in the last row/column instead of being dropped.
    /// A cell size that would need more than [`MAX_CELLS`] cells is widened,
    /// so [`SpatialIndex::cell_size`] may be larger than requested.
    pub fn build(particles: &[Particle], cell_size: f32, bounds: Bounds) -> Result<Self> {
        let mut index = Self {
            cell_size: 1.0,
            cols: 0,
            rows: 0,
            buckets: Vec::new(),
        };
        index.rebuild(particles, cell_size, bounds)?;
        Ok(index)
    }

    /// Same result as [`SpatialIndex::build`], reusing bucket allocations.
    pub fn rebuild(&mut self, particles: &[Particle], cell_size: f32, bounds: Bounds) -> Result<()> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SimError::invalid(format!("cell size must be positive, got {}", cell_size)));
        }

        let cell_size = bounded_cell_size(bounds, cell_size);
        let cols = grid_extent(bounds.width, cell_size);
        let rows = grid_extent(bounds.height, cell_size);

        self.cell_size = cell_size;
        self.cols = cols;
        self.rows = rows;
        self.buckets.resize_with(cols * rows, Vec::new);
        for bucket in &mut self.buckets {
            bucket.clear();
        }

        for (i, p) in particles.iter().enumerate() {
            let (cx, cy) = self.cell_of(p.position);
            self.buckets[cy * cols + cx].push(i);
        }

        trace!(
            "spatial index rebuilt: {}x{} cells, {} particles",
            cols,
            rows,
            particles.len()
        );
        Ok(())
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cell containing `position`, clamped into the grid
    pub fn cell_of(&self, position: Vec2) -> (usize, usize) {
        (
            clamp_cell(position.x / self.cell_size, self.cols),
            clamp_cell(position.y / self.cell_size, self.rows),
        )
    }

    /// Particle indices in cell (cx, cy); empty outside the grid
    pub fn bucket(&self, cx: usize, cy: usize) -> &[usize] {
        if cx < self.cols && cy < self.rows {
            &self.buckets[cy * self.cols + cx]
        } else {
            &[]
        }
    }

    /// Non-empty cells in row-major order
    pub fn occupied_cells(&self) -> impl Iterator<Item = (usize, usize, &[usize])> + '_ {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(move |(i, bucket)| (i % self.cols, i / self.cols, bucket.as_slice()))
    }

    /// Total number of indexed particles
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

/// ceil(extent / cell) cells, never fewer than one
fn grid_extent(extent: f32, cell_size: f32) -> usize {
    if extent.is_finite() && extent > 0.0 {
        ((extent / cell_size).ceil() as usize).max(1)
    } else {
        1
    }
}

fn cell_count(bounds: Bounds, cell_size: f32) -> f64 {
    let along = |extent: f32| {
        if extent.is_finite() && extent > 0.0 {
            (f64::from(extent) / f64::from(cell_size)).ceil().max(1.0)
        } else {
            1.0
        }
    };
    along(bounds.width) * along(bounds.height)
}

/// Smallest cell size >= `requested` whose grid has at most MAX_CELLS cells
fn bounded_cell_size(bounds: Bounds, requested: f32) -> f32 {
    let limit = MAX_CELLS as f64;
    if cell_count(bounds, requested) <= limit {
        return requested;
    }
    let extent = |e: f32| if e.is_finite() && e > 0.0 { e } else { 0.0 };
    let (w, h) = (extent(bounds.width), extent(bounds.height));
    let mut cell = requested
        .max((w * h / MAX_CELLS as f32).sqrt())
        .max(w / MAX_CELLS as f32)
        .max(h / MAX_CELLS as f32);
    while cell_count(bounds, cell) > limit {
        cell *= 1.01;
    }
    cell
}

fn clamp_cell(scaled: f32, extent: usize) -> usize {
    // NaN and negatives saturate to 0 in the cast
    (scaled.floor() as usize).min(extent - 1)
}
