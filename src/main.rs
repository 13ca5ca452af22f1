use std::fs::{self, File};
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use lectern::app::App;
use lectern::reflow;
use lectern::session::{self, SessionStore, StoreError};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(
    name = "lectern",
    version,
    about = "A terminal reading-session engine for text, Markdown and PDF files"
)]
struct Cli {
    /// Document to open; without one, the library picker is shown
    file: Option<PathBuf>,

    /// Wrap width for reflowed text. Changing it invalidates saved
    /// positions, since they address lines of the reflowed output.
    #[arg(long, default_value_t = reflow::DEFAULT_WIDTH)]
    width: usize,

    /// Delete the persisted session store and exit
    #[arg(long)]
    reset_sessions: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();
    info!("starting lectern");

    let store_path =
        session::default_store_path().context("could not determine a data directory")?;
    let store = if cli.reset_sessions {
        let store = SessionStore::at(store_path);
        store.reset()?;
        println!("Removed {}", store.file_path().display());
        return Ok(());
    } else {
        match SessionStore::open(store_path) {
            Ok(store) => store,
            Err(e @ StoreError::Corrupt { .. }) => {
                return Err(anyhow!(e)
                    .context("the session store is corrupt; run `lectern --reset-sessions` to start over"));
            }
            Err(e) => return Err(e.into()),
        }
    };

    let mut app = App::new(store, cli.width)?;
    if let Some(file) = &cli.file {
        let abs = if file.is_absolute() {
            file.clone()
        } else {
            std::env::current_dir()
                .context("failed to get current directory")?
                .join(file)
        };
        app.open_document(&abs.to_string_lossy());
    }

    // Terminal initialization
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("application error: {err:?}");
    }
    info!("shutting down lectern");
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    <B as ratatui::backend::Backend>::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| app.draw(f))?;
        if app.should_quit() {
            return Ok(());
        }
        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
    }
}

/// File logging under the state directory. Failures here are not fatal:
/// a reader without a log file still works.
fn init_logging() {
    let Some(log_path) = session::resolve_log_path() else {
        return;
    };
    if let Some(parent) = log_path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    if let Ok(file) = File::create(&log_path) {
        let _ = WriteLogger::init(LevelFilter::Info, Config::default(), file);
    }
}
