use crate::app::{App, Focus};
use crate::braille;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 24;

/// Height of the status and parameter boxes, borders included
const STATUS_HEIGHT: u16 = 6;
const PARAMS_HEIGHT: u16 = 13;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 50;

/// Number of lines in controls content
pub const CONTROLS_CONTENT_LINES: u16 = 16;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Inner canvas rectangle (excluding borders) for a frame of the given size
pub fn canvas_area(frame_area: Rect, fullscreen: bool) -> Rect {
    let offset = if fullscreen { 0 } else { SIDEBAR_WIDTH.min(frame_area.width) };
    Rect {
        x: frame_area.x + offset + 1,
        y: frame_area.y + 1,
        width: frame_area.width.saturating_sub(offset + 2),
        height: frame_area.height.saturating_sub(2),
    }
}

/// Calculate the canvas size (excluding borders)
pub fn get_canvas_size(frame_area: Rect, fullscreen: bool) -> (u16, u16) {
    let inner = canvas_area(frame_area, fullscreen);
    (inner.width, inner.height)
}

/// Lines of the controls box visible for a terminal of the given height
pub fn get_controls_visible_lines(terminal_height: u16) -> u16 {
    terminal_height
        .saturating_sub(STATUS_HEIGHT + PARAMS_HEIGHT)
        .saturating_sub(2)
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Length(PARAMS_HEIGHT),
            Constraint::Min(6),
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Particle Links ");
    let simulation = &app.simulation;

    let (status_text, status_color) = if simulation.paused {
        ("PAUSED", HIGHLIGHT_COLOR)
    } else {
        ("RUNNING", Color::Green)
    };

    let message = app
        .status_message
        .clone()
        .unwrap_or_else(|| format!("mode: {}", simulation.config().mode.name()));

    let content = vec![
        Line::from(Span::styled(
            format!("{} particles", simulation.particles().len()),
            Style::default().fg(TEXT_COLOR),
        )),
        Line::from(Span::styled(
            format!("{} links  {:.0} fps", app.link_count, app.fps),
            Style::default().fg(TEXT_COLOR),
        )),
        Line::from(Span::styled(status_text, Style::default().fg(status_color))),
        Line::from(Span::styled(message, Style::default().fg(DIM_TEXT_COLOR))),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let make_line = |label: &str, value: String, focused: bool| {
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        Line::from(Span::styled(format!("{}{}: {}", prefix, label, value), style))
    };

    let config = app.simulation.config();

    let content = vec![
        make_line("Boundary", config.boundary.name().to_string(), app.focus == Focus::Boundary),
        make_line("Count", format!("{}", config.count), app.focus == Focus::Count),
        make_line("Damping", format!("{:.3}", config.damping), app.focus == Focus::Damping),
        make_line("Gravity", format!("{:.0}", config.gravity), app.focus == Focus::Gravity),
        make_line("Link", format!("{:.0}", config.link_radius), app.focus == Focus::LinkRadius),
        make_line("Mode", config.mode.name().to_string(), app.focus == Focus::Mode),
        make_line("Bounce", format!("{:.2}", config.restitution), app.focus == Focus::Restitution),
        make_line("Speed", format!("{:.0}", config.speed), app.focus == Focus::Speed),
        make_line("Steps", format!("{}", app.steps_per_frame), app.focus == Focus::Steps),
        make_line("Trails", format!("{:.2}", config.trails), app.focus == Focus::Trails),
        make_line("Wind", format!("{:.0}", config.wind), app.focus == Focus::Wind),
    ];

    // Calculate scroll to keep focused item visible based on actual area
    let focus_line = app.focus.line_index();
    let visible_height = area.height.saturating_sub(2);
    let content_height = content.len() as u16;

    let scroll = if visible_height == 0 || visible_height >= content_height {
        0
    } else if focus_line >= visible_height {
        focus_line.saturating_sub(visible_height - 1)
    } else {
        0
    };

    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let config = app.simulation.config();

    let make_control = |key: &str, desc: String| -> Line<'_> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let content = vec![
        make_control("Space", "pause/resume".to_string()),
        make_control("H", "help".to_string()),
        make_control("A/R/N", format!("mode: {}", config.mode.name())),
        make_control("B", format!("boundary: {}", config.boundary.name())),
        make_control("G", format!("grid: {}", if config.show_grid { "on" } else { "off" })),
        make_control("1-9", "presets".to_string()),
        make_control("S", "save preset".to_string()),
        make_control("D", "save config".to_string()),
        make_control("L", "load config".to_string()),
        make_control("C", "clear".to_string()),
        make_control("V", "fullscreen".to_string()),
        make_control("Tab", "select param".to_string()),
        make_control("Click", "select/drag".to_string()),
        make_control("S+Clk", "burst".to_string()),
        make_control("Q", "quit".to_string()),
    ];

    let content_height = content.len() as u16;
    let visible_height = area.height.saturating_sub(2);
    let is_scrollable = content_height > visible_height;

    let title = if is_scrollable {
        " Controls (↑↓) "
    } else {
        " Controls "
    };

    let paragraph = Paragraph::new(content)
        .block(styled_block(title))
        .scroll((app.controls_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cells = braille::render_to_braille(
        &app.simulation,
        &app.trails,
        inner.width,
        inner.height,
        app.selected,
    );

    let buf = frame.buffer_mut();
    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            if let Some(target) = buf.cell_mut((x, y)) {
                target.set_char(cell.char).set_fg(cell.color);
            }
        }
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let canvas_x = if app.fullscreen_mode { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if app.fullscreen_mode {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    // Center the help dialog within the canvas
    let help_width = 56.min(canvas_width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(36);
    let x = canvas_x + (canvas_width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    let help_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: help_width,
        height: help_height,
    };

    frame.render_widget(Clear, help_area);

    let heading = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(HIGHLIGHT_COLOR)));
    let topic = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(TEXT_COLOR)));

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("PARTICLE LINKS", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Particles drift under gravity and a slowly turning wind. Pairs closer than the link radius are joined by a line that fades with distance."),
        Line::from(""),
        heading("POINTER:"),
        topic("A / R / N - Attract, Repel, None"),
        Line::from("The pointer pulls or pushes nearby particles with a force that falls off with the square of the distance."),
        Line::from("Click selects the nearest particle and dragging pulls it along. Shift+click spawns a burst."),
        Line::from(""),
        heading("WORLD:"),
        topic("B - Boundary"),
        Line::from("Wrap (leave one edge, enter the opposite) or Bounce (reflect off the walls)."),
        topic("G - Grid"),
        Line::from("Shows the spatial grid. Its cell size equals the link radius, so links only ever span neighbouring cells."),
        Line::from(""),
        heading("PRESETS (1-9):"),
        Line::from("1=Jelly, 2=Fireflies, 3=Breeze, 4=Galaxy, 5=Mesh, 6=Pinball, then saved presets. S saves the current settings as a preset."),
        Line::from(""),
        heading("FILES:"),
        Line::from("D saves the configuration as JSON, L loads it back. Keys missing from the file keep their current value."),
        Line::from(""),
        heading("BASIC CONTROLS:"),
        Line::from("Space/P=Pause, C=Clear, V=Fullscreen, Tab/Arrows=Adjust, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2);
    let is_scrollable = content_height > visible_height;

    let title = if is_scrollable {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
