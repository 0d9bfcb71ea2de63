//! servodoor entry point.
//!
//! # Usage
//!
//! ```bash
//! # Pick a port interactively
//! servodoor
//!
//! # Open a controller straight away, logging to a file
//! SERVODOOR_LOGGING_LEVEL=debug servodoor --port /dev/ttyACM0
//!
//! # Write the defaults somewhere to edit them
//! servodoor --write-config --config ./servodoor.toml
//! ```

use clap::Parser;
use servodoor::config::{
    get_default_config_path, Config, ConfigLoader, LogFormat, LoggingConfig,
};
use servodoor::controller::{Command, ControllerSettings, SessionController};
use servodoor::device::SerialDoorConnector;
use servodoor::directory::SystemPortDirectory;
use servodoor::error::{AppError, AppResult};
use servodoor::pipeline::AmpyDeployer;
use servodoor::tui::App;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

#[derive(Parser, Debug)]
#[command(
    name = "servodoor",
    version,
    about = "Inspect, toggle and reconfigure serial-connected servo door controllers."
)]
struct Args {
    /// Configuration file. Without it the usual search path is used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Open a session on this port at startup.
    #[arg(short, long)]
    port: Option<String>,

    /// Log level or filter directive, overriding the configuration.
    #[arg(long)]
    log_level: Option<String>,

    /// Write the default configuration to `--config` (or the platform
    /// config path) and exit.
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    if args.write_config {
        return write_default_config(args.config);
    }

    let mut config = load_config(args.config.as_ref())?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "servodoor starting");

    let controller = SessionController::new(
        Box::new(SerialDoorConnector::from_config(&config)),
        Arc::new(AmpyDeployer::from_config(&config.deploy)),
        Box::new(SystemPortDirectory::from_config(&config.serial)),
        ControllerSettings::from_config(&config),
    );
    let handle = controller.spawn();

    if let Some(port) = args.port {
        handle.send(Command::OpenClose { port }).await?;
    }

    App::new(handle, &config).run().await
}

fn write_default_config(target: Option<PathBuf>) -> AppResult<()> {
    let Some(path) = target.or_else(get_default_config_path) else {
        return Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no platform config directory; pass --config",
        )));
    };
    ConfigLoader::with_defaults().save_to(&path)?;
    println!("wrote default configuration to {}", path.display());
    Ok(())
}

fn load_config(explicit: Option<&PathBuf>) -> AppResult<Config> {
    if let Some(path) = explicit {
        return Ok(ConfigLoader::load_from(path)?.into_config());
    }

    match ConfigLoader::load() {
        Ok(loader) => Ok(loader.into_config()),
        Err(e) => {
            eprintln!("Warning: Failed to load config, using defaults: {}", e);
            Ok(ConfigLoader::with_defaults().into_config())
        }
    }
}

/// Install the global subscriber.
///
/// The terminal belongs to the TUI, so logs only go to `logging.file`.
/// Without a file nothing is installed and events are dropped.
fn init_logging(logging: &LoggingConfig) -> AppResult<()> {
    let Some(path) = &logging.file else {
        return Ok(());
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let writer = Arc::new(file);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match logging.format {
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| AppError::logging(e.to_string()))?;

    if std::env::var_os("RUST_LOG").is_some() {
        warn!("RUST_LOG overrides logging.level");
    }
    Ok(())
}
