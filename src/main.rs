use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    ConfigCommand, FoodCommand, GroomingCommand, HealthCommand, PetCommand, SyncCommand,
    TreatmentCommand, WeightCommand,
};
use pawtrack::config::Config;
use pawtrack::db::{init_db, LocalStore};
use pawtrack::sync::{HttpRemoteStore, SyncEngine, SyncStatusStore, TrackedStore};

#[derive(Parser)]
#[command(name = "pawtrack")]
#[command(version)]
#[command(about = "A pet-care record keeper", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage pets
    Pet(PetCommand),

    /// Track weight measurements
    Weight(WeightCommand),

    /// Track vaccinations and other treatments
    Treatment(TreatmentCommand),

    /// Track grooming sessions
    Grooming(GroomingCommand),

    /// Track health events
    Health(HealthCommand),

    /// Manage food products
    Food(FoodCommand),

    /// Synchronize with the remote store
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "pawtrack=warn".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Pet(cmd)) => {
            let store = open_store(&config).await?;
            let tracked = TrackedStore::new(store.clone());
            cmd.run(&tracked, &config).await?;
            auto_sync(&store, &config).await;
        }
        Some(Commands::Weight(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&TrackedStore::new(store.clone())).await?;
            auto_sync(&store, &config).await;
        }
        Some(Commands::Treatment(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&TrackedStore::new(store.clone())).await?;
            auto_sync(&store, &config).await;
        }
        Some(Commands::Grooming(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&TrackedStore::new(store.clone())).await?;
            auto_sync(&store, &config).await;
        }
        Some(Commands::Health(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&TrackedStore::new(store.clone())).await?;
            auto_sync(&store, &config).await;
        }
        Some(Commands::Food(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&TrackedStore::new(store.clone())).await?;
            auto_sync(&store, &config).await;
        }
        Some(Commands::Sync(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&store, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<LocalStore, Box<dyn std::error::Error>> {
    let pool = init_db(Some(config.database_path.clone())).await?;
    Ok(LocalStore::new(pool))
}

fn build_engine(
    store: &LocalStore,
    config: &Config,
) -> Result<SyncEngine, Box<dyn std::error::Error>> {
    let remote = Arc::new(HttpRemoteStore::from_config(&config.sync)?);
    Ok(SyncEngine::new(store.clone(), remote, SyncStatusStore::new())
        .with_strategy(config.sync.replace_strategy))
}

/// Runs a sync after a mutating command when auto-sync is enabled.
async fn auto_sync(store: &LocalStore, config: &Config) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }

    match build_engine(store, config) {
        Ok(engine) => {
            let report = engine.synchronize().await;
            println!("Auto-sync: {}", report.outcome);
        }
        Err(e) => eprintln!("Auto-sync skipped: {}", e),
    }
}
