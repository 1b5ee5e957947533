//! shopfront - terminal storefront and donation client
//!
//! Without a subcommand this opens the interactive storefront; otherwise it runs
//! the subcommand once and exits.

use std::io;
use std::panic;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use shopfront::app::App;
use shopfront::cart::CartStore;
use shopfront::cli::Cli;
use shopfront::config::Config;
use shopfront::{commands, logging, ui};

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    config.apply_cli(&cli);

    match cli.command {
        Some(command) => {
            logging::init_stderr(config.log_level.as_deref());
            let mut stdout = io::stdout().lock();
            match commands::run(command, &config, &mut stdout).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::debug!(error = ?e, "Command failed");
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        None => match run_tui(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

/// Runs the interactive storefront until the user quits
async fn run_tui(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Held until exit so buffered log lines are flushed
    let _log_guard = config
        .log_dir()
        .and_then(|dir| logging::init_file(&dir, config.log_level.as_deref()));

    let catalog = config.build_catalog()?;
    let carts = CartStore::open(config.data_store()?)?;
    let mut app = App::new(catalog, carts);
    tracing::info!(api_url = %config.api_url, offline = config.offline, "Starting storefront");

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        // Queued network work runs after the frame showing its progress label
        if app.pending.is_some() {
            app.run_pending().await;
            continue;
        }

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
