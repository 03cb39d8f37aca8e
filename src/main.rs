use clap::Parser;
use color_eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use legalai::app::{Action, App};
use legalai::config::Config;
use legalai::disclaimer::DisclaimerStore;
use legalai::logging::init_logging;
use legalai::ui::ui;

#[derive(Parser, Debug)]
#[command(name = "legalai", version, about = "Uzbek legal assistant in your terminal")]
struct Cli {
    /// Path to a config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the Gemini model from the config
    #[arg(short, long)]
    model: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Warning: file logging disabled: {}", e);
    }

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        eprintln!("Warning: Failed to load config, using defaults. Error: {:#}", e);
        Config::default()
    });
    if let Some(model) = cli.model {
        config.model = model;
    }
    tracing::info!(model = %config.model, "starting legalai");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let mut app = App::new(action_tx.clone(), config, DisclaimerStore::from_project_dirs());

    // Input handling task
    let input_handle = {
        let tx = action_tx.clone();
        tokio::spawn(async move {
            loop {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                            let _ = tx.send(Action::UserInput(key));
                        }
                        Ok(Event::Mouse(mouse)) => match mouse.kind {
                            MouseEventKind::ScrollUp => {
                                let _ = tx.send(Action::Scroll(-3));
                            }
                            MouseEventKind::ScrollDown => {
                                let _ = tx.send(Action::Scroll(3));
                            }
                            _ => {}
                        },
                        Ok(Event::Resize(w, h)) => {
                            let _ = tx.send(Action::Resize(w, h));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "reading terminal event failed");
                            let _ = tx.send(Action::Quit);
                            break;
                        }
                    },
                    // Tick for spinner
                    Ok(false) => {
                        let _ = tx.send(Action::Render);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "polling terminal events failed");
                        let _ = tx.send(Action::Quit);
                        break;
                    }
                }
            }
        })
    };

    let res = run_app(&mut terminal, &mut app, &mut action_rx).await;

    // Restore
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    input_handle.abort();
    let _ = io::stdout().flush();

    tracing::info!("exiting");
    res
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App<'_>,
    action_rx: &mut mpsc::UnboundedReceiver<Action>,
) -> Result<()> {
    let mut last_tick = std::time::Instant::now();
    let tick_rate = Duration::from_millis(100);

    terminal.draw(|f| ui(f, app))?;

    loop {
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        tokio::select! {
            Some(action) = action_rx.recv() => {
                match action {
                    Action::Render => {
                        terminal.draw(|f| ui(f, app))?;
                    }
                    Action::Resize(_, _) => terminal.autoresize()?,
                    Action::Quit => return Ok(()),
                    _ => {
                        if app.update(action).await {
                            terminal.draw(|f| ui(f, app))?;
                        }
                    }
                }
            }
            _ = tokio::time::sleep(timeout) => {
                if app.is_loading() {
                    app.spinner_state.calc_next();
                    terminal.draw(|f| ui(f, app))?;
                }
                last_tick = std::time::Instant::now();
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(());
            }
        }
    }
}
