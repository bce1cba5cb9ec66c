//! Pawtrack Admin CLI
//!
//! Administration tool for managing API keys on the sync server.
//!
//! # Usage
//!
//! ```bash
//! pawtrack-admin key add erik@example.com --group family1
//! pawtrack-admin key list
//! pawtrack-admin key remove erik@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `PAWTRACK_SERVER_CONFIG`: Path to the server config file
//!   (default: ~/.config/pawtrack-server/config.yaml)

use clap::{Args, Parser, Subcommand};
use rand::distr::{Alphanumeric, SampleString};
use std::path::PathBuf;

use pawtrack::server::{ApiKeyEntry, KeysFile};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "pawtrack-admin")]
#[command(version)]
#[command(about = "Pawtrack server administration tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage API keys
    Key(KeyCommand),
}

#[derive(Args)]
struct KeyCommand {
    #[command(subcommand)]
    command: KeySubcommand,
}

#[derive(Subcommand)]
enum KeySubcommand {
    /// Add a new API key for a user
    Add {
        /// User identifier, e.g. an email address
        user_id: String,

        /// Group ID for data access
        #[arg(long, short)]
        group: String,
    },

    /// List configured API keys
    List,

    /// Remove a key by key value or user id
    Remove {
        /// API key or user identifier
        key_or_user: String,
    },
}

fn config_path() -> PathBuf {
    std::env::var("PAWTRACK_SERVER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pawtrack-server")
                .join("config.yaml")
        })
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let path = config_path();

    match cli.command {
        Commands::Key(cmd) => match cmd.command {
            KeySubcommand::Add { user_id, group } => {
                let mut file = KeysFile::load(&path)?;

                if file.api_keys.iter().any(|e| e.user_id == user_id) {
                    return Err(format!("User '{}' already has a key", user_id));
                }

                let key = Alphanumeric.sample_string(&mut rand::rng(), 40);
                file.api_keys.push(ApiKeyEntry {
                    key: key.clone(),
                    user_id: user_id.clone(),
                    group_id: group.clone(),
                });
                file.save(&path)?;

                println!("Added key for {} (group {}):", user_id, group);
                println!();
                println!("  {}", key);
                println!();
                println!("Config file: {}", path.display());
                Ok(())
            }

            KeySubcommand::List => {
                let file = KeysFile::load(&path)?;

                if file.api_keys.is_empty() {
                    println!("No API keys configured");
                    return Ok(());
                }

                println!("{:<30}  {:<15}  KEY", "USER", "GROUP");
                println!("{}", "-".repeat(70));
                for entry in &file.api_keys {
                    println!(
                        "{:<30}  {:<15}  {}...",
                        entry.user_id,
                        entry.group_id,
                        &entry.key[..entry.key.len().min(8)]
                    );
                }
                Ok(())
            }

            KeySubcommand::Remove { key_or_user } => {
                let mut file = KeysFile::load(&path)?;
                let before = file.api_keys.len();

                file.api_keys
                    .retain(|e| e.key != key_or_user && e.user_id != key_or_user);

                if file.api_keys.len() == before {
                    return Err(format!("No key matching '{}'", key_or_user));
                }

                file.save(&path)?;
                println!("Removed {} key(s)", before - file.api_keys.len());
                Ok(())
            }
        },
    }
}
