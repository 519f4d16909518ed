// main.rs

mod aggregate;
mod app;
mod convert;
mod event;
mod map;
mod ui;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::info;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use app::{App, CurrentScreen, FileEntry, LoadedDocument};
use event::{Event, EventHandler};

/// Terminal viewer for KML files: interactive map plus feature-count and
/// line-length tables.
#[derive(Parser)]
struct Cli {
    /// Directory to scan for .kml files
    #[arg(default_value = ".")]
    directory: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = Cli::parse();
    let kml_files = scan_kml_files(&args.directory)?;
    info!(
        "found {} .kml files in {}",
        kml_files.len(),
        args.directory.display()
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(250));
    let mut app = App::new(kml_files);
    let result = run(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Logs go to a file so the alternate screen stays clean; nothing is set up
/// unless RUST_LOG asks for it.
fn init_logging() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        let log_file = fs::File::create("kml-viewer.log").context("creating kml-viewer.log")?;
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(log_file)))
            .init();
    }
    Ok(())
}

fn scan_kml_files(directory: &Path) -> anyhow::Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    for dir_entry in fs::read_dir(directory)
        .with_context(|| format!("reading directory {}", directory.display()))?
    {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        let is_kml = path.is_file()
            && path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| extension.eq_ignore_ascii_case("kml"));
        if !is_kml {
            continue;
        }
        let Some(name) = path
            .file_name()
            .and_then(|file_name| file_name.to_str())
            .map(String::from)
        else {
            continue;
        };
        let metadata = dir_entry.metadata()?;
        let modified = metadata
            .modified()
            .ok()
            .map(chrono::DateTime::<chrono::Local>::from);
        entries.push(FileEntry {
            name,
            path,
            size_kb: metadata.len() / 1024,
            modified,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> anyhow::Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, app))?;

        match events.next()? {
            Event::Tick | Event::Resize => {}
            Event::Input(key) => handle_key(app, key, events.sender()),
            Event::LoadComplete {
                generation,
                name,
                result,
            } => app.apply_load(generation, name, result),
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, sender: Sender<Event>) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.current_screen == CurrentScreen::Help {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Esc => {
                app.current_screen = CurrentScreen::Viewer;
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Char('?') => app.current_screen = CurrentScreen::Help,
        KeyCode::Char('j') | KeyCode::Char('J') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Char('K') | KeyCode::Up => app.select_previous(),
        KeyCode::Enter => {
            if let Some((generation, path)) = app.request_load() {
                spawn_load(generation, path, sender);
            }
        }
        KeyCode::Char('s') | KeyCode::Char('S') => app.view.toggle_summary(),
        KeyCode::Char('d') | KeyCode::Char('D') => app.view.toggle_details(),
        KeyCode::Char('h') | KeyCode::Left => app.viewport.pan(-1.0, 0.0),
        KeyCode::Char('l') | KeyCode::Right => app.viewport.pan(1.0, 0.0),
        KeyCode::Char('u') | KeyCode::Char('U') => app.viewport.pan(0.0, 1.0),
        KeyCode::Char('n') | KeyCode::Char('N') => app.viewport.pan(0.0, -1.0),
        KeyCode::Char('+') | KeyCode::Char('=') => app.viewport.zoom_in(),
        KeyCode::Char('-') => app.viewport.zoom_out(),
        KeyCode::Char('f') | KeyCode::Char('F') => {
            if let Some(bbox) = app.view.collection.as_ref().and_then(map::bounds) {
                app.viewport = map::Viewport::fit(bbox);
            }
        }
        _ => {}
    }
}

/// Reads, converts and aggregates off the UI thread; the completion lands in
/// the main event queue tagged with its request generation.
fn spawn_load(generation: u64, path: PathBuf, sender: Sender<Event>) {
    thread::spawn(move || {
        let name = path
            .file_name()
            .map(|file_name| file_name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let result = convert::load_file(&path).map(|collection| {
            let summary = aggregate::summarize(&collection);
            LoadedDocument {
                collection,
                summary,
            }
        });
        // A closed channel just means the app already exited.
        let _ = sender.send(Event::LoadComplete {
            generation,
            name,
            result,
        });
    });
}
