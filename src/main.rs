use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::time::Duration;
use topomap::app::{App, ViewMode};
use topomap::data::{self, FileInventory, Inventory};
use topomap::map::basemap::{Basemap, MapSurface};
use topomap::ui;

fn main() -> Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    // Load data before the TUI starts so warnings stay readable
    let mut basemap = Basemap::new();
    if data_dir.exists() {
        data::load_basemap(&mut basemap, &data_dir);
    }
    if !basemap.has_data() {
        data::generate_simple_world(&mut basemap);
    }

    let inventory: Box<dyn Inventory> = match FileInventory::open(&data_dir.join("inventory.json"))
    {
        Ok(inv) => Box::new(inv),
        Err(e) => {
            eprintln!("warning: {e:#}; using built-in sample inventory");
            Box::new(data::sample_inventory())
        }
    };

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, MapSurface::new(basemap), inventory);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn run(
    terminal: &mut DefaultTerminal,
    surface: MapSurface,
    inventory: Box<dyn Inventory>,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize, surface, inventory);

    // Initial load: the sites view in the remembered overview mode
    app.load_sites_view();

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        handle_key(&mut app, key.code);
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse);
                }
                Event::Resize(width, height) => {
                    app.resize(width as usize, height as usize);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode) {
    // Open popups capture input first
    if app.chrome.detail.is_some() {
        if matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.chrome.close_detail();
        }
        return;
    }
    if app.chrome.context_menu.is_some() {
        match code {
            KeyCode::Esc => app.chrome.context_menu = None,
            KeyCode::Up | KeyCode::Char('k') => app.menu_up(),
            KeyCode::Down | KeyCode::Char('j') => app.menu_down(),
            KeyCode::Enter => app.menu_choose(),
            _ => {}
        }
        return;
    }

    match code {
        KeyCode::Char('q') => app.quit(),

        // Esc unwinds: fanned cluster, then drill-down, then quit
        KeyCode::Esc => {
            if app.expanded.is_some() {
                app.collapse_cluster();
            } else if matches!(app.mode, ViewMode::Drilldown(_)) {
                app.refresh();
            } else {
                app.quit();
            }
        }

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // View controls
        KeyCode::Char('m') | KeyCode::Char('M') => app.toggle_overview(),
        KeyCode::Char('t') | KeyCode::Char('T') => app.cycle_base_style(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.refresh(),

        // Activate whatever is under the cursor
        KeyCode::Enter => {
            if let Some((px, py)) = app.mouse_pixel_pos() {
                app.activate_at(px, py);
            }
        }

        _ => {}
    }
}

/// Handle mouse events for panning, zooming, and activation
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for the cursor marker and tooltips
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        // Scroll wheel zooms towards the mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll pans (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Left click activates a primitive; empty map starts a drag-pan
        MouseEventKind::Down(MouseButton::Left) => {
            if app.chrome.context_menu.is_some() {
                app.chrome.context_menu = None;
            } else if app.chrome.detail.is_some() {
                app.chrome.close_detail();
            } else {
                let (px, py) = App::cell_to_pixel(mouse.column, mouse.row);
                if app.hit_test(px, py).is_some() {
                    app.activate_at(px, py);
                } else {
                    app.last_mouse = Some((mouse.column, mouse.row));
                }
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        // Right click opens the context menu for the hit object
        MouseEventKind::Down(MouseButton::Right) => {
            let (px, py) = App::cell_to_pixel(mouse.column, mouse.row);
            app.context_menu_at(px, py, (mouse.column, mouse.row));
        }
        _ => {}
    }
}
