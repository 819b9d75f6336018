use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use gator::cli::{self, Cli, Commands};
use gator::{Config, Database};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration; only a missing file falls back to defaults
    if !cli.config.exists() {
        eprintln!(
            "{} not found, using default configuration.",
            cli.config.display()
        );
    }
    let mut config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        config.logging.file = None;
        gator::logging::init_console_only(&config.logging.level);
    }

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            eprintln!("Failed to open database {}: {e}", config.database.path);
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    if matches!(cli.command, Commands::Agg { .. }) {
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    let mut stdout = std::io::stdout();
    let result = cli::execute(cli.command, &config, &cli.config, &db, cancel, &mut stdout).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
