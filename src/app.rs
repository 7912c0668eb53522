use crate::braille::{self, TrailBuffer};
use log::{info, warn};
use particle_links::config::MAX_STEPS_PER_FRAME;
use particle_links::{
    AppConfig, ConfigPatch, InteractionMode, PointerState, Preset, PresetManager, Simulation,
    SimulationConfig, MAX_DT,
};
use std::path::PathBuf;
use std::time::Instant;

/// Click selection reach in world units
pub const SELECT_RADIUS: f32 = 16.0;

/// Particles spawned by a shift+click
pub const BURST_SIZE: usize = 30;

/// Focus state for parameter editing in the sidebar
/// Alphabetically ordered for consistent UI display
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    #[default]
    None,
    Boundary,
    Count,
    Damping,
    Gravity,
    LinkRadius,
    Mode,
    Restitution,
    Speed,
    Steps,
    Trails,
    Wind,
    // Controls box (not a param)
    Controls,
}

impl Focus {
    /// Tab cycles through parameters in alphabetical order
    pub fn next(&self) -> Focus {
        match self {
            Focus::None | Focus::Controls => Focus::Boundary,
            Focus::Boundary => Focus::Count,
            Focus::Count => Focus::Damping,
            Focus::Damping => Focus::Gravity,
            Focus::Gravity => Focus::LinkRadius,
            Focus::LinkRadius => Focus::Mode,
            Focus::Mode => Focus::Restitution,
            Focus::Restitution => Focus::Speed,
            Focus::Speed => Focus::Steps,
            Focus::Steps => Focus::Trails,
            Focus::Trails => Focus::Wind,
            Focus::Wind => Focus::Boundary,
        }
    }

    /// Shift+Tab cycles in reverse
    pub fn prev(&self) -> Focus {
        match self {
            Focus::None | Focus::Controls => Focus::Wind,
            Focus::Boundary => Focus::Wind,
            Focus::Count => Focus::Boundary,
            Focus::Damping => Focus::Count,
            Focus::Gravity => Focus::Damping,
            Focus::LinkRadius => Focus::Gravity,
            Focus::Mode => Focus::LinkRadius,
            Focus::Restitution => Focus::Mode,
            Focus::Speed => Focus::Restitution,
            Focus::Steps => Focus::Speed,
            Focus::Trails => Focus::Steps,
            Focus::Wind => Focus::Trails,
        }
    }

    /// Line in the parameters box for this focus
    pub fn line_index(&self) -> u16 {
        match self {
            Focus::None | Focus::Controls => 0,
            Focus::Boundary => 0,
            Focus::Count => 1,
            Focus::Damping => 2,
            Focus::Gravity => 3,
            Focus::LinkRadius => 4,
            Focus::Mode => 5,
            Focus::Restitution => 6,
            Focus::Speed => 7,
            Focus::Steps => 8,
            Focus::Trails => 9,
            Focus::Wind => 10,
        }
    }

    /// Check if focus is on a parameter (not Controls or None)
    pub fn is_param(&self) -> bool {
        !matches!(self, Focus::None | Focus::Controls)
    }
}

/// Main application state
pub struct App {
    pub simulation: Simulation,
    pub presets: PresetManager,
    pub trails: TrailBuffer,
    pub pointer: PointerState,
    /// Particle highlighted by the last click
    pub selected: Option<usize>,
    pub focus: Focus,
    pub fullscreen_mode: bool,
    pub steps_per_frame: usize,
    pub show_help: bool,
    pub help_scroll: u16,
    pub controls_scroll: u16,
    /// Where `d` saves and `l` loads
    pub config_path: Option<PathBuf>,
    /// One-line feedback shown in the status box
    pub status_message: Option<String>,
    pub fps: f32,
    pub link_count: usize,
    canvas_width: u16,
    canvas_height: u16,
    last_tick: Instant,
}

impl App {
    pub fn new(
        canvas_width: u16,
        canvas_height: u16,
        app_config: AppConfig,
        seed: Option<u64>,
        config_path: Option<PathBuf>,
    ) -> particle_links::Result<Self> {
        let bounds = braille::calculate_world_bounds(canvas_width, canvas_height);
        let simulation = match seed {
            Some(seed) => Simulation::with_seed(app_config.simulation, bounds, seed)?,
            None => Simulation::new(app_config.simulation, bounds)?,
        };

        Ok(Self {
            simulation,
            presets: PresetManager::new(),
            trails: TrailBuffer::new(canvas_width, canvas_height),
            pointer: PointerState::default(),
            selected: None,
            focus: Focus::Controls,
            fullscreen_mode: false,
            steps_per_frame: app_config.steps_per_frame.clamp(1, MAX_STEPS_PER_FRAME),
            show_help: false,
            help_scroll: 0,
            controls_scroll: 0,
            config_path,
            status_message: None,
            fps: 0.0,
            link_count: 0,
            canvas_width,
            canvas_height,
            last_tick: Instant::now(),
        })
    }

    /// Advance the simulation for the current frame
    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        if elapsed > 0.0 {
            let instant_fps = 1.0 / elapsed;
            self.fps = if self.fps == 0.0 {
                instant_fps
            } else {
                self.fps * 0.9 + instant_fps * 0.1
            };
        }

        let dt = elapsed.min(MAX_DT);
        let bounds = braille::calculate_world_bounds(self.canvas_width, self.canvas_height);
        for _ in 0..self.steps_per_frame {
            self.simulation.advance(dt, bounds, &self.pointer);
            // Drag displacement applies to the first step only
            self.pointer.settle();
        }

        self.trails.update(&self.simulation);
        let mut links = 0;
        self.simulation.for_each_link(|_, _, _| links += 1);
        self.link_count = links;
    }

    /// Replace the configuration with an edited copy; rejected edits only
    /// produce a status message
    fn edit_config(&mut self, edit: impl FnOnce(&mut SimulationConfig)) {
        let mut config = self.simulation.config().clone();
        edit(&mut config);
        if let Err(e) = self.simulation.set_config(config) {
            self.status_message = Some(e.to_string());
        }
        self.clamp_selection();
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_up(&mut self) {
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::Boundary => self.cycle_boundary(),
            Focus::Count => self.edit_config(|c| c.adjust_count(50)),
            Focus::Damping => self.edit_config(|c| c.adjust_damping(0.005)),
            Focus::Gravity => self.edit_config(|c| c.adjust_gravity(10.0)),
            Focus::LinkRadius => self.edit_config(|c| c.adjust_link_radius(5.0)),
            Focus::Mode => self.edit_config(|c| c.cycle_mode()),
            Focus::Restitution => self.edit_config(|c| c.adjust_restitution(0.05)),
            Focus::Speed => self.edit_config(|c| c.adjust_speed(5.0)),
            Focus::Steps => self.steps_per_frame = (self.steps_per_frame + 1).min(MAX_STEPS_PER_FRAME),
            Focus::Trails => self.edit_config(|c| c.adjust_trails(0.05)),
            Focus::Wind => self.edit_config(|c| c.adjust_wind(10.0)),
        }
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_down(&mut self) {
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::Boundary => self.cycle_boundary(),
            Focus::Count => self.edit_config(|c| c.adjust_count(-50)),
            Focus::Damping => self.edit_config(|c| c.adjust_damping(-0.005)),
            Focus::Gravity => self.edit_config(|c| c.adjust_gravity(-10.0)),
            Focus::LinkRadius => self.edit_config(|c| c.adjust_link_radius(-5.0)),
            Focus::Mode => self.edit_config(|c| c.mode = c.mode.prev()),
            Focus::Restitution => self.edit_config(|c| c.adjust_restitution(-0.05)),
            Focus::Speed => self.edit_config(|c| c.adjust_speed(-5.0)),
            Focus::Steps => self.steps_per_frame = self.steps_per_frame.saturating_sub(1).max(1),
            Focus::Trails => self.edit_config(|c| c.adjust_trails(-0.05)),
            Focus::Wind => self.edit_config(|c| c.adjust_wind(-10.0)),
        }
    }

    /// Cycle to next focus
    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    /// Navigate to previous parameter (Shift+Tab)
    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.edit_config(|c| c.mode = mode);
        self.focus = Focus::Mode;
    }

    pub fn toggle_pause(&mut self) {
        self.simulation.toggle_pause();
    }

    pub fn toggle_grid(&mut self) {
        self.edit_config(|c| c.show_grid = !c.show_grid);
    }

    pub fn cycle_boundary(&mut self) {
        self.edit_config(|c| c.cycle_boundary());
    }

    /// Remove every particle; the count parameter drops to zero
    pub fn clear(&mut self) {
        self.simulation.clear();
        self.trails.clear();
        self.selected = None;
        self.pointer.dragging = None;
    }

    /// Apply the preset at `index` in display order (built-ins first)
    pub fn apply_preset_index(&mut self, index: usize) {
        let Some(preset) = self.presets.all_presets().nth(index).cloned() else {
            return;
        };
        match self.simulation.apply_preset(&preset) {
            Ok(()) => self.status_message = Some(format!("Preset: {}", preset.name)),
            Err(e) => self.status_message = Some(e.to_string()),
        }
        self.clamp_selection();
    }

    /// Store the current configuration as a user preset
    pub fn save_user_preset(&mut self) {
        let name = format!("Custom {}", self.presets.user.len() + 1);
        let preset = Preset::new(
            name.clone(),
            "Saved from the running simulation",
            ConfigPatch::from_config(self.simulation.config()),
        );
        self.status_message = Some(match self.presets.save_preset(preset) {
            Ok(()) => format!("Saved preset {}", name),
            Err(e) => e.to_string(),
        });
    }

    fn current_app_config(&self) -> AppConfig {
        AppConfig {
            version: 1,
            simulation: self.simulation.config().clone(),
            steps_per_frame: self.steps_per_frame,
        }
    }

    fn resolve_config_path(&self) -> particle_links::Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => particle_links::config::default_config_path(),
        }
    }

    /// Export the configuration as JSON
    pub fn save_config(&mut self) {
        let result = self
            .resolve_config_path()
            .and_then(|path| self.current_app_config().save_to_file(&path).map(|_| path));
        self.status_message = Some(match result {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => {
                warn!("save failed: {}", e);
                e.to_string()
            }
        });
    }

    /// Merge a JSON configuration file over the current settings
    pub fn load_config(&mut self) {
        let result = self.resolve_config_path().and_then(|path| {
            let merged = self.current_app_config().merge_from_file(&path)?;
            self.simulation.set_config(merged.simulation)?;
            self.steps_per_frame = merged.steps_per_frame;
            Ok(path)
        });
        self.status_message = Some(match result {
            Ok(path) => format!("Loaded {}", path.display()),
            Err(e) => {
                warn!("load failed: {}", e);
                e.to_string()
            }
        });
        self.clamp_selection();
    }

    // === Pointer ===

    /// Mouse button pressed at canvas cell (cx, cy). Shift spawns a burst,
    /// a plain click selects the nearest particle and starts dragging it.
    pub fn pointer_down(&mut self, cx: u16, cy: u16, shift: bool) {
        let world = braille::cell_to_world(cx, cy);
        self.pointer.move_to(world.x, world.y);
        self.pointer.settle();

        if shift {
            let speed = self.simulation.config().speed;
            self.simulation.spawn_burst(world.x, world.y, BURST_SIZE, speed);
            return;
        }

        self.selected = self.simulation.select_nearest(world.x, world.y, SELECT_RADIUS);
        self.pointer.down = true;
        self.pointer.dragging = self.selected;
        if let Some(i) = self.selected {
            info!("selected particle {}", i);
        }
    }

    /// Mouse moved (with or without a button held)
    pub fn pointer_move(&mut self, cx: u16, cy: u16) {
        let world = braille::cell_to_world(cx, cy);
        self.pointer.move_to(world.x, world.y);
    }

    pub fn pointer_up(&mut self) {
        self.pointer.down = false;
        self.pointer.dragging = None;
    }

    /// Pointer left the canvas: no interaction force until it returns
    pub fn pointer_leave(&mut self) {
        self.pointer.present = false;
        self.pointer_up();
    }

    /// Drop a selection that no longer points at a live particle
    fn clamp_selection(&mut self) {
        let len = self.simulation.particles().len();
        if self.selected.is_some_and(|i| i >= len) {
            self.selected = None;
        }
        if self.pointer.dragging.is_some_and(|i| i >= len) {
            self.pointer.dragging = None;
        }
    }

    // === View ===

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0;
        }
    }

    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    pub fn scroll_controls_up(&mut self) {
        self.controls_scroll = self.controls_scroll.saturating_sub(1);
    }

    pub fn scroll_controls_down(&mut self, max_scroll: u16) {
        self.controls_scroll = (self.controls_scroll + 1).min(max_scroll);
    }

    /// Resize simulation to match new canvas size
    pub fn resize(&mut self, canvas_width: u16, canvas_height: u16) {
        if (canvas_width, canvas_height) == (self.canvas_width, self.canvas_height) {
            return;
        }
        self.canvas_width = canvas_width;
        self.canvas_height = canvas_height;
        self.trails = TrailBuffer::new(canvas_width, canvas_height);
        self.simulation
            .resize(braille::calculate_world_bounds(canvas_width, canvas_height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use particle_links::BoundaryPolicy;

    fn app() -> App {
        let config = AppConfig {
            simulation: SimulationConfig {
                count: 50,
                ..Default::default()
            },
            ..Default::default()
        };
        App::new(40, 20, config, Some(5), None).unwrap()
    }

    #[test]
    fn test_focus_cycle_covers_all_params() {
        let mut focus = Focus::Controls;
        let mut seen = Vec::new();
        for _ in 0..11 {
            focus = focus.next();
            assert!(focus.is_param());
            seen.push(focus.line_index());
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..11).collect::<Vec<u16>>());
        assert_eq!(focus.next(), Focus::Boundary);
        assert_eq!(Focus::Boundary.prev(), Focus::Wind);
    }

    #[test]
    fn test_adjusting_count_resizes_population() {
        let mut app = app();
        app.focus = Focus::Count;
        app.adjust_focused_up();
        assert_eq!(app.simulation.particles().len(), 100);
        app.adjust_focused_down();
        app.adjust_focused_down();
        assert_eq!(app.simulation.particles().len(), 0);
    }

    #[test]
    fn test_mode_and_boundary_keys() {
        let mut app = app();
        app.set_mode(InteractionMode::Attract);
        assert_eq!(app.simulation.config().mode, InteractionMode::Attract);
        app.cycle_boundary();
        assert_eq!(app.simulation.config().boundary, BoundaryPolicy::Bounce);
        app.toggle_grid();
        assert!(app.simulation.config().show_grid);
    }

    #[test]
    fn test_shift_click_spawns_burst() {
        let mut app = app();
        app.pointer_down(10, 5, true);
        assert_eq!(app.simulation.particles().len(), 50 + BURST_SIZE);
        assert!(app.pointer.dragging.is_none());
    }

    #[test]
    fn test_click_selects_and_drags() {
        let mut app = app();
        app.clear();
        let target = braille::cell_to_world(3, 3);
        app.simulation.spawn_burst(target.x + 2.0, target.y, 1, 0.0);

        app.pointer_down(3, 3, false);
        assert_eq!(app.selected, Some(0));
        assert_eq!(app.pointer.dragging, Some(0));

        app.pointer_up();
        assert!(app.pointer.dragging.is_none());
        assert_eq!(app.selected, Some(0));
    }

    #[test]
    fn test_clear_drops_selection() {
        let mut app = app();
        app.selected = Some(3);
        app.clear();
        assert!(app.selected.is_none());
        assert!(app.simulation.particles().is_empty());
    }

    #[test]
    fn test_preset_keys_apply() {
        let mut app = app();
        app.apply_preset_index(4);
        assert_eq!(app.simulation.particles().len(), 800);
        assert_eq!(app.simulation.config().link_radius, 85.0);
        assert_eq!(app.status_message.as_deref(), Some("Preset: Mesh"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app();
        app.config_path = Some(dir.path().join("config.json"));
        app.set_mode(InteractionMode::None);
        app.save_config();

        app.set_mode(InteractionMode::Attract);
        app.load_config();
        assert_eq!(app.simulation.config().mode, InteractionMode::None);
    }

    #[test]
    fn test_load_rejects_bad_file_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"count": -10}"#).unwrap();

        let mut app = app();
        app.config_path = Some(path);
        let before = app.simulation.config().clone();
        app.load_config();
        assert_eq!(app.simulation.config(), &before);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_tick_counts_links() {
        let mut app = app();
        app.clear();
        app.simulation.spawn_burst(100.0, 100.0, 3, 0.0);
        app.tick();
        assert_eq!(app.link_count, 3);
    }
}
