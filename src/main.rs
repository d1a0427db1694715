use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod inputter;
mod model;
mod ui;

use controller::Controller;
use csvbrowse::domain::{BrowseConfig, BrowseError};
use model::{Model, Status};
use ui::TableUI;

/// Browse CSV files in the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV file to open at start
    file: Option<String>,

    /// Rows per page
    #[arg(long, default_value_t = 10)]
    page_size: usize,

    /// Directory uploaded files are stored in while they are open
    #[arg(long)]
    uploads_dir: Option<String>,

    /// Directory exports are written to
    #[arg(long, default_value = ".")]
    export_dir: String,

    /// Upper bound for the width of a rendered column
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Milliseconds to wait for terminal events per iteration
    #[arg(long, default_value_t = 100)]
    event_poll_time: u64,

    /// Log file, defaults to csvbrowse.log in the temp directory
    #[arg(long)]
    log_file: Option<String>,

    /// Log filter, e.g. "info" or "csvbrowse=trace". RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn expand_path(path: &str) -> Result<PathBuf, BrowseError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| BrowseError::InvalidPath(e.to_string()))
}

fn init_logging(args: &Args) -> Result<(), BrowseError> {
    let log_file = match &args.log_file {
        Some(path) => expand_path(path)?,
        None => std::env::temp_dir().join("csvbrowse.log"),
    };
    let file = File::create(&log_file)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn build_config(args: &Args) -> Result<BrowseConfig, BrowseError> {
    let mut config = BrowseConfig::default()
        .page_size(args.page_size.max(1))
        .max_column_width(args.max_column_width)
        .event_poll_time(args.event_poll_time)
        .export_dir(expand_path(&args.export_dir)?);
    if let Some(dir) = &args.uploads_dir {
        config = config.uploads_dir(expand_path(dir)?);
    }
    Ok(config)
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: could not set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Starting csvbrowse with {:?}", config);

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &config, args.file.as_deref());
    ratatui::restore();

    match result {
        Err(e) => {
            error!("Terminated with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(
    terminal: &mut ratatui::DefaultTerminal,
    config: &BrowseConfig,
    file: Option<&str>,
) -> Result<(), BrowseError> {
    let size = terminal.size()?;
    let mut model = Model::init(config, size.width as usize, size.height as usize)?;
    if let Some(file) = file {
        model.open(file);
    }

    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message, also picks up finished uploads
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    Ok(())
}
