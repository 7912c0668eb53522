use crate::color;
use glam::Vec2;
use particle_links::{Bounds, Simulation};
use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// World units per Braille dot
pub const WORLD_SCALE: f32 = 4.0;

/// Links weaker than this (1 - d/r) are not drawn
pub const LINK_THRESHOLD: f32 = 0.08;

/// Trail dots below this intensity are dropped
const TRAIL_CUTOFF: f32 = 0.05;

/// A single rendered Braille cell with position and color
#[derive(Clone, Copy)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Per-character accumulator. Colour priority: selection, particles, links,
/// trails, and dark grey for grid-only cells.
#[derive(Clone, Copy, Default)]
struct CellAccum {
    pattern: u8,
    particle_dots: u16,
    hue_sum: f32,
    selected: bool,
    link_strength: f32,
    trail: f32,
    trail_hue: f32,
}

impl CellAccum {
    fn color(&self) -> Color {
        if self.selected {
            Color::Rgb(255, 255, 255)
        } else if self.particle_dots > 0 {
            color::particle_color(self.hue_sum / self.particle_dots as f32)
        } else if self.link_strength > 0.0 {
            color::link_color(self.link_strength)
        } else if self.trail > 0.0 {
            color::trail_color(self.trail_hue, self.trail)
        } else {
            Color::DarkGray
        }
    }
}

/// Character grid addressed in dot coordinates
struct DotCanvas {
    width: usize,
    height: usize,
    cells: Vec<CellAccum>,
}

impl DotCanvas {
    fn new(canvas_width: u16, canvas_height: u16) -> Self {
        let width = canvas_width as usize;
        let height = canvas_height as usize;
        Self {
            width,
            height,
            cells: vec![CellAccum::default(); width * height],
        }
    }

    /// Set dot (dx, dy) and return its cell; `None` off-canvas
    fn dot(&mut self, dx: i32, dy: i32) -> Option<&mut CellAccum> {
        if dx < 0 || dy < 0 {
            return None;
        }
        let (dx, dy) = (dx as usize, dy as usize);
        let (cx, cy) = (dx / 2, dy / 4);
        if cx >= self.width || cy >= self.height {
            return None;
        }
        let cell = &mut self.cells[cy * self.width + cx];
        cell.pattern |= BRAILLE_DOTS[dx % 2][dy % 4];
        Some(cell)
    }

    fn into_cells(self) -> Vec<BrailleCell> {
        let width = self.width;
        self.cells
            .into_iter()
            .enumerate()
            .filter(|(_, cell)| cell.pattern != 0)
            .map(|(i, cell)| BrailleCell {
                x: (i % width) as u16,
                y: (i / width) as u16,
                char: char::from_u32(BRAILLE_BASE + cell.pattern as u32).unwrap_or(' '),
                color: cell.color(),
            })
            .collect()
    }
}

/// Fading afterimage of particle positions, in dot space.
///
/// Each frame every dot keeps `1 - trails` of its intensity, so a trails
/// setting of 1 clears completely and small values leave long streaks.
pub struct TrailBuffer {
    width: usize,
    height: usize,
    intensity: Vec<f32>,
    hue: Vec<f32>,
}

impl TrailBuffer {
    pub fn new(canvas_width: u16, canvas_height: u16) -> Self {
        let width = canvas_width as usize * 2;
        let height = canvas_height as usize * 4;
        Self {
            width,
            height,
            intensity: vec![0.0; width * height],
            hue: vec![0.0; width * height],
        }
    }

    /// Decay all dots, then stamp the current particle positions
    pub fn update(&mut self, simulation: &Simulation) {
        let keep = 1.0 - simulation.config().trails;
        for v in &mut self.intensity {
            *v *= keep;
            if *v < TRAIL_CUTOFF {
                *v = 0.0;
            }
        }
        for p in simulation.particles().iter() {
            let (dx, dy) = world_to_dot(p.position);
            if let Some(i) = self.index(dx, dy) {
                self.intensity[i] = 1.0;
                self.hue[i] = p.hue;
            }
        }
    }

    pub fn clear(&mut self) {
        self.intensity.fill(0.0);
    }

    fn index(&self, dx: i32, dy: i32) -> Option<usize> {
        if dx < 0 || dy < 0 || dx as usize >= self.width || dy as usize >= self.height {
            None
        } else {
            Some(dy as usize * self.width + dx as usize)
        }
    }

    fn lit(&self) -> impl Iterator<Item = (i32, i32, f32, f32)> + '_ {
        self.intensity
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > 0.0)
            .map(|(i, &v)| ((i % self.width) as i32, (i / self.width) as i32, v, self.hue[i]))
    }
}

/// Render particles, links, trails and the optional grid to Braille characters
pub fn render_to_braille(
    simulation: &Simulation,
    trails: &TrailBuffer,
    canvas_width: u16,
    canvas_height: u16,
    selected: Option<usize>,
) -> Vec<BrailleCell> {
    let mut canvas = DotCanvas::new(canvas_width, canvas_height);
    let config = simulation.config();

    if config.show_grid {
        draw_grid(&mut canvas, simulation.index().cell_size(), simulation.bounds());
    }

    // A trails value of 1 clears the whole frame, leaving nothing to draw
    if config.trails < 1.0 {
        for (dx, dy, intensity, hue) in trails.lit() {
            if let Some(cell) = canvas.dot(dx, dy) {
                if intensity > cell.trail {
                    cell.trail = intensity;
                    cell.trail_hue = hue;
                }
            }
        }
    }

    let particles = simulation.particles().as_slice();
    let radius = config.link_radius;
    simulation.for_each_link(|a, b, distance| {
        let strength = 1.0 - distance / radius;
        if strength < LINK_THRESHOLD {
            return;
        }
        let (x0, y0) = world_to_dot(particles[a].position);
        let (x1, y1) = world_to_dot(particles[b].position);
        bresenham(x0, y0, x1, y1, |dx, dy| {
            if let Some(cell) = canvas.dot(dx, dy) {
                cell.link_strength = cell.link_strength.max(strength);
            }
        });
    });

    for (i, p) in particles.iter().enumerate() {
        let (dx, dy) = world_to_dot(p.position);
        if let Some(cell) = canvas.dot(dx, dy) {
            cell.particle_dots += 1;
            cell.hue_sum += p.hue;
            cell.selected |= selected == Some(i);
        }
    }

    canvas.into_cells()
}

/// Dotted lines on the spatial index cell boundaries
fn draw_grid(canvas: &mut DotCanvas, cell_size: f32, bounds: Bounds) {
    let step = cell_size / WORLD_SCALE;
    if !(step >= 1.0) {
        return;
    }
    let dot_w = (bounds.width / WORLD_SCALE) as i32;
    let dot_h = (bounds.height / WORLD_SCALE) as i32;

    let mut x = step;
    while (x as i32) < dot_w {
        for dy in (0..dot_h).step_by(3) {
            canvas.dot(x as i32, dy);
        }
        x += step;
    }
    let mut y = step;
    while (y as i32) < dot_h {
        for dx in (0..dot_w).step_by(3) {
            canvas.dot(dx, y as i32);
        }
        y += step;
    }
}

/// Plot every dot on the line from (x0, y0) to (x1, y1), both ends included
pub fn bresenham(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        plot(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn world_to_dot(position: Vec2) -> (i32, i32) {
    (
        (position.x / WORLD_SCALE).floor() as i32,
        (position.y / WORLD_SCALE).floor() as i32,
    )
}

/// World-space centre of terminal cell (cx, cy), relative to the canvas origin
pub fn cell_to_world(cx: u16, cy: u16) -> Vec2 {
    Vec2::new(
        (cx as f32 + 0.5) * 2.0 * WORLD_SCALE,
        (cy as f32 + 0.5) * 4.0 * WORLD_SCALE,
    )
}

/// Simulation bounds covered by a canvas of the given size in characters
pub fn calculate_world_bounds(canvas_width: u16, canvas_height: u16) -> Bounds {
    // Braille gives 2x4 resolution per character
    Bounds::new(
        canvas_width as f32 * 2.0 * WORLD_SCALE,
        canvas_height as f32 * 4.0 * WORLD_SCALE,
    )
}
