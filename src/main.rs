mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use geoquery_map::data::{self, RowItem};
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOG_FILE: &str = "geoquery-map.log";

fn main() -> Result<()> {
    // The terminal belongs to the UI, so logs go to a file. RUST_LOG overrides the level.
    let log_file = File::create(LOG_FILE).with_context(|| format!("creating {}", LOG_FILE))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let (rows, source) = load_dataset(std::env::args().nth(1).map(PathBuf::from))?;
    let basemap = data::load_basemap(Path::new("data"));

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize, &rows, basemap, source);
    let result = run(&mut terminal, &mut app);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Rows from the file given on the command line, or the built-in demo set
fn load_dataset(path: Option<PathBuf>) -> Result<(Vec<RowItem>, String)> {
    match path {
        Some(path) => {
            let rows = data::load_rows(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok((rows, name))
        }
        None => {
            log::info!("no rows file given, showing demo data");
            Ok((data::demo_rows(), "demo".to_string()))
        }
    }
}

/// Handle mouse events for panning, zooming and selection
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in(),
        MouseEventKind::ScrollDown => app.zoom_out(),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click selects, drag pans
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        app.redraw();
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -8),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 8),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            KeyCode::Char('m') | KeyCode::Char('M') => app.cycle_mode(),
                            KeyCode::Char('L') => app.toggle_labels(),
                            KeyCode::Char('b') | KeyCode::Char('B') => app.toggle_basemap(),
                            KeyCode::Char('e') | KeyCode::Char('E') => app.export(),

                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
