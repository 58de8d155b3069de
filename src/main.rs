// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pokedex::{project_with, write_cards, AcquisitionService, Aggregation, OutputFormat, PokedexConfig};

#[derive(Parser)]
#[command(name = "pokedex", version, about = "Searchable creature catalog in the terminal")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of catalog entries to fetch
    #[arg(long, global = true)]
    limit: Option<u32>,

    /// Index offset to start from
    #[arg(long, global = true)]
    offset: Option<u32>,

    /// Keep entries that resolved even if others failed
    #[arg(long, global = true)]
    best_effort: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Write logs to this file (the TUI defaults to pokedex.log in the temp dir)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive grid (default)
    Tui,
    /// Fetch once and print the matching cards
    List {
        /// Case-insensitive name filter
        #[arg(long, short, default_value = "")]
        query: String,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Table => OutputFormat::Table,
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let command = cli.command.unwrap_or(Command::Tui);

    let tui = matches!(command, Command::Tui);
    init_logging(&cli.log_level, cli.log_file.as_deref(), tui)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    match command {
        Command::Tui => run_ui_mode(&runtime, config),
        Command::List { query, format } => run_list(&runtime, &config, &query, format.into()),
    }
}

fn load_config(cli: &Cli) -> Result<PokedexConfig> {
    let mut config = PokedexConfig::load(cli.config.as_deref())?;

    if let Some(limit) = cli.limit {
        config.api.limit = limit;
    }
    if let Some(offset) = cli.offset {
        config.api.offset = offset;
    }
    if cli.best_effort {
        config.acquisition.aggregation = Aggregation::BestEffort;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(level: &str, log_file: Option<&Path>, tui: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    match log_target(log_file, tui) {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file: {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

/// File to log into, or None for stderr.
/// The TUI always gets a file: stderr would draw over the alternate screen.
fn log_target(log_file: Option<&Path>, tui: bool) -> Option<PathBuf> {
    match log_file {
        Some(path) => Some(path.to_path_buf()),
        None if tui => Some(std::env::temp_dir().join("pokedex.log")),
        None => None,
    }
}

fn run_list(
    runtime: &tokio::runtime::Runtime,
    config: &PokedexConfig,
    query: &str,
    format: OutputFormat,
) -> Result<()> {
    let service = AcquisitionService::from_config(config);
    let outcome = runtime
        .block_on(service.fetch_batch())
        .context("Failed to acquire catalog")?;

    for failure in &outcome.failures {
        eprintln!("⚠️  {} could not be resolved: {}", failure.name, failure.error);
    }

    let cards = project_with(&outcome.records, query, &config.api.artwork_base);
    write_cards(io::stdout().lock(), &cards, format)
}

#[cfg(feature = "tui")]
fn run_ui_mode(runtime: &tokio::runtime::Runtime, config: PokedexConfig) -> Result<()> {
    use pokedex::RecordStore;
    use std::sync::Arc;

    let store = Arc::new(Mutex::new(RecordStore::new(config.acquisition.overlap)));
    let service = Arc::new(AcquisitionService::from_config(&config));

    let trigger = {
        let handle = runtime.handle().clone();
        let store = store.clone();
        move || {
            let store = store.clone();
            let service = service.clone();
            handle.spawn(async move { service.refresh(&store).await });
        }
    };

    let mut app = ui::App::new(store, &config.api.artwork_base, Box::new(trigger));

    // Initial acquisition
    app.request_refresh();

    ui::run_ui(&mut app)?;

    println!("\n✅ Pokédex closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_runtime: &tokio::runtime::Runtime, _config: PokedexConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or list once: pokedex list --query pika");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tui_logs_to_temp_file_by_default() {
        let target = log_target(None, true).unwrap();

        assert_eq!(target, std::env::temp_dir().join("pokedex.log"));
    }

    #[test]
    fn test_explicit_log_file_wins() {
        let path = Path::new("/var/log/pokedex-run.log");

        assert_eq!(log_target(Some(path), true).as_deref(), Some(path));
        assert_eq!(log_target(Some(path), false).as_deref(), Some(path));
    }

    #[test]
    fn test_list_mode_logs_to_stderr() {
        assert_eq!(log_target(None, false), None);
    }
}
