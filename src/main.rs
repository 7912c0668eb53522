mod app;
mod braille;
mod color;
mod logging;
mod ui;

use app::{App, Focus};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, LevelFilter};
use particle_links::{AppConfig, BoundaryPolicy, ConfigPatch, InteractionMode, PresetManager};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "particle-links")]
#[command(about = "Particles linked by proximity, simulated on a spatial grid in the terminal")]
struct Args {
    // === Population ===
    /// Number of particles (0-5000)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    count: Option<i64>,

    /// Spawn velocity range (0-120)
    #[arg(long)]
    speed: Option<f32>,

    // === Forces ===
    /// Link radius in world units; also the spatial grid cell size (20-250)
    #[arg(short = 'r', long = "link-radius")]
    link_radius: Option<f32>,

    /// Vertical acceleration, positive pulls down
    #[arg(short = 'g', long, allow_negative_numbers = true)]
    gravity: Option<f32>,

    /// Per-frame velocity multiplier, in (0, 1]
    #[arg(short = 'd', long)]
    damping: Option<f32>,

    /// Wind magnitude (>= 0)
    #[arg(short = 'w', long)]
    wind: Option<f32>,

    /// Pointer interaction mode (none, attract, repel)
    #[arg(short = 'm', long)]
    mode: Option<String>,

    /// Boundary policy (wrap, bounce)
    #[arg(short = 'b', long)]
    boundary: Option<String>,

    // === Setup ===
    /// Start from a named preset (Jelly, Fireflies, Breeze, Galaxy, Mesh, ...)
    #[arg(short = 'p', long)]
    preset: Option<String>,

    /// Configuration file to load at startup and for the D/L keys
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Random seed for a reproducible initial layout
    #[arg(long)]
    seed: Option<u64>,

    // === Logging ===
    /// Write log records to this file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
}

fn parse_mode(s: &str) -> Result<InteractionMode, String> {
    match s.to_lowercase().as_str() {
        "none" | "off" => Ok(InteractionMode::None),
        "attract" | "pull" => Ok(InteractionMode::Attract),
        "repel" | "push" => Ok(InteractionMode::Repel),
        other => Err(format!("unknown mode '{}' (expected none, attract or repel)", other)),
    }
}

fn parse_boundary(s: &str) -> Result<BoundaryPolicy, String> {
    match s.to_lowercase().as_str() {
        "wrap" | "toroidal" => Ok(BoundaryPolicy::Wrap),
        "bounce" | "reflect" => Ok(BoundaryPolicy::Bounce),
        other => Err(format!("unknown boundary '{}' (expected wrap or bounce)", other)),
    }
}

/// Build the starting configuration: config file, then preset, then flags.
/// Every layer is validated, so bad input fails before the terminal is touched.
fn initial_config(args: &Args) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut app_config = match &args.config {
        Some(path) if path.exists() => AppConfig::load_from_file(path)?,
        _ => AppConfig::default(),
    };

    if let Some(name) = &args.preset {
        let presets = PresetManager::new();
        let preset = presets.find(name).ok_or_else(|| {
            format!(
                "unknown preset '{}' (available: {})",
                name,
                presets.preset_names().join(", ")
            )
        })?;
        app_config.simulation = preset.patch.apply(&app_config.simulation)?;
    }

    let patch = ConfigPatch {
        count: args.count,
        speed: args.speed,
        link_radius: args.link_radius,
        gravity: args.gravity,
        damping: args.damping,
        wind: args.wind,
        mode: args.mode.as_deref().map(parse_mode).transpose()?,
        boundary: args.boundary.as_deref().map(parse_boundary).transpose()?,
        ..Default::default()
    };
    app_config.simulation = patch.apply(&app_config.simulation)?;

    Ok(app_config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    logging::init(args.log_file.as_deref(), args.log_level)?;
    let app_config = initial_config(&args)?;
    info!("starting with {:?}", app_config.simulation);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let frame_rect = Rect::new(0, 0, size.width, size.height);
    let (canvas_width, canvas_height) = ui::get_canvas_size(frame_rect, false);

    let res = App::new(canvas_width, canvas_height, app_config, args.seed, args.config.clone())
        .map_err(io::Error::other)
        .and_then(|mut app| run_app(&mut terminal, &mut app));

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Route a mouse event to the app in canvas-relative cell coordinates
fn handle_mouse(app: &mut App, mouse: MouseEvent, frame_area: Rect) {
    let canvas = ui::canvas_area(frame_area, app.fullscreen_mode);
    let inside = mouse.column >= canvas.x
        && mouse.row >= canvas.y
        && mouse.column < canvas.x + canvas.width
        && mouse.row < canvas.y + canvas.height;

    if !inside {
        if matches!(mouse.kind, MouseEventKind::Up(_)) {
            app.pointer_up();
        } else {
            app.pointer_leave();
        }
        return;
    }

    let (cx, cy) = (mouse.column - canvas.x, mouse.row - canvas.y);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let shift = mouse.modifiers.contains(KeyModifiers::SHIFT);
            app.pointer_down(cx, cy, shift);
        }
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => app.pointer_move(cx, cy),
        MouseEventKind::Up(MouseButton::Left) => app.pointer_up(),
        _ => {}
    }
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    // Target ~60fps for smooth animation
    const FRAME_DURATION: Duration = Duration::from_millis(16);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        // Drain every pending event before the next tick so mouse motion
        // does not lag behind
        let mut timeout = FRAME_DURATION;
        while event::poll(timeout)? {
            timeout = Duration::ZERO;
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }

                    match key.code {
                        // System controls
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Char('P') => app.toggle_pause(),
                        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => app.toggle_help(),
                        KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_fullscreen(),

                        // Interaction mode
                        KeyCode::Char('a') | KeyCode::Char('A') => app.set_mode(InteractionMode::Attract),
                        KeyCode::Char('r') | KeyCode::Char('R') => app.set_mode(InteractionMode::Repel),
                        KeyCode::Char('n') | KeyCode::Char('N') => app.set_mode(InteractionMode::None),

                        // World
                        KeyCode::Char('g') | KeyCode::Char('G') => app.toggle_grid(),
                        KeyCode::Char('b') | KeyCode::Char('B') => {
                            app.cycle_boundary();
                            app.focus = Focus::Boundary;
                        }
                        KeyCode::Char('c') | KeyCode::Char('C') => app.clear(),
                        KeyCode::Char(c @ '1'..='9') => {
                            app.apply_preset_index(c as usize - '1' as usize);
                        }

                        // Files
                        KeyCode::Char('d') | KeyCode::Char('D') => app.save_config(),
                        KeyCode::Char('l') | KeyCode::Char('L') => app.load_config(),
                        KeyCode::Char('s') | KeyCode::Char('S') => app.save_user_preset(),

                        // Navigation
                        KeyCode::Tab => app.next_focus(),
                        KeyCode::BackTab => app.prev_focus(),
                        KeyCode::Up => {
                            if !app.show_help {
                                if app.focus.is_param() {
                                    app.adjust_focused_up();
                                } else {
                                    app.scroll_controls_up();
                                }
                            }
                        }
                        KeyCode::Down => {
                            if !app.show_help {
                                if app.focus.is_param() {
                                    app.adjust_focused_down();
                                } else {
                                    let term_size = terminal.size().unwrap_or_default();
                                    let visible = ui::get_controls_visible_lines(term_size.height);
                                    app.scroll_controls_down(ui::CONTROLS_CONTENT_LINES.saturating_sub(visible));
                                }
                            }
                        }
                        KeyCode::Esc => {
                            if app.show_help {
                                app.toggle_help();
                            } else if app.focus.is_param() {
                                app.focus = Focus::Controls;
                            } else {
                                app.status_message = None;
                            }
                        }
                        KeyCode::Char('j') | KeyCode::Char('J') => {
                            if app.show_help {
                                app.scroll_help_down(ui::HELP_CONTENT_LINES);
                            }
                        }
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            if app.show_help {
                                app.scroll_help_up();
                            }
                        }
                        _ => {}
                    }
                }
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    handle_mouse(app, mouse, Rect::new(0, 0, size.width, size.height));
                }
                Event::Resize(width, height) => {
                    let (canvas_width, canvas_height) =
                        ui::get_canvas_size(Rect::new(0, 0, width, height), app.fullscreen_mode);
                    app.resize(canvas_width, canvas_height);
                }
                _ => {}
            }
        }

        // Fullscreen toggles change the canvas without a resize event
        let size = terminal.size()?;
        let (canvas_width, canvas_height) =
            ui::get_canvas_size(Rect::new(0, 0, size.width, size.height), app.fullscreen_mode);
        app.resize(canvas_width, canvas_height);

        app.tick();
    }
}
