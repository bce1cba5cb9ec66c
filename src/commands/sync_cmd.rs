//! Sync CLI commands.

use clap::{Args, Subcommand};
use std::sync::Arc;

use pawtrack::config::Config;
use pawtrack::db::LocalStore;
use pawtrack::sync::{
    ChangeQueue, HttpRemoteStore, RemoteStore, SyncEngine, SyncError, SyncInfoStore,
    SyncLogStore, SyncOutcome, SyncStatusStore,
};

/// Sync with the remote store
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and state
    Status,

    /// Show recent sync log entries
    Log {
        /// Number of entries to show
        #[arg(long, short, default_value = "20")]
        limit: i64,
    },

    /// Show recent change queue entries
    Queue {
        /// Number of entries to show
        #[arg(long, short, default_value = "20")]
        limit: i64,
    },
}

impl SyncCommand {
    pub async fn run(
        &self,
        store: &LocalStore,
        config: &Config,
    ) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync(store, config).await,
            Some(SyncSubcommand::Status) => self.status(store, config).await,
            Some(SyncSubcommand::Log { limit }) => self.log(store, *limit).await,
            Some(SyncSubcommand::Queue { limit }) => self.queue(store, *limit).await,
        }
    }

    async fn sync(&self, store: &LocalStore, config: &Config) -> Result<(), SyncCommandError> {
        let engine = build_engine(store, config)?;

        println!("Syncing with remote store...");

        let report = engine.synchronize().await;

        match report.outcome {
            SyncOutcome::Pushed => println!("✓ pushed local data to remote"),
            SyncOutcome::Pulled => println!("✓ pulled remote data (remote was newer)"),
            SyncOutcome::NoChanges => println!("✓ already up to date"),
            SyncOutcome::Offline => println!("✗ offline; nothing synced"),
            SyncOutcome::AlreadySyncing => println!("✗ a sync is already running"),
            SyncOutcome::Failed => {
                println!("✗ sync failed: {}", report.error.as_deref().unwrap_or("?"))
            }
        }

        if report.drained + report.failed_entries > 0 {
            println!(
                "  queue: {} applied, {} failed",
                report.drained, report.failed_entries
            );
        }

        Ok(())
    }

    async fn status(
        &self,
        store: &LocalStore,
        config: &Config,
    ) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        if !config.sync.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!("    api_key: \"your-api-key\"");
            println!("    auto_sync: false");
            println!();
            println!("Or set environment variables:");
            println!("  PAWTRACK_SYNC_URL");
            println!("  PAWTRACK_SYNC_API_KEY");
            return Ok(());
        }

        let server_url = config.sync.server_url.as_ref().unwrap();
        let api_key = config.sync.api_key.as_ref().unwrap();

        println!("Server:    {}", server_url);
        println!("API Key:   {}...", &api_key[..api_key.len().min(8)]);
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Strategy:  {}", config.sync.replace_strategy);
        println!();

        let info = SyncInfoStore::new(store.pool().clone()).load().await?;
        match info {
            Some(info) => {
                println!("Last update: {}", info.last_update.to_rfc3339());
                println!("Fingerprint: {}...", &info.data_hash[..info.data_hash.len().min(16)]);
                println!("Status:      {}", info.status);
            }
            None => println!("Never synced"),
        }

        let pending = ChangeQueue::new(store.pool().clone()).pending_count().await?;
        println!("Pending changes: {}", pending);
        println!();

        print!("Server status: ");
        let remote = HttpRemoteStore::from_config(&config.sync)?;
        if remote.is_online().await {
            println!("✓ reachable");
        } else {
            println!("✗ unreachable");
        }

        Ok(())
    }

    async fn log(&self, store: &LocalStore, limit: i64) -> Result<(), SyncCommandError> {
        let entries = SyncLogStore::new(store.pool().clone()).recent(limit).await?;

        if entries.is_empty() {
            println!("Sync log is empty");
            return Ok(());
        }

        for entry in &entries {
            let error = entry
                .error
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default();
            println!(
                "{}  {:<8} {:<7} {}{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.operation.to_string(),
                entry.status.to_string(),
                entry.details,
                error
            );
        }

        Ok(())
    }

    async fn queue(&self, store: &LocalStore, limit: i64) -> Result<(), SyncCommandError> {
        let entries = ChangeQueue::new(store.pool().clone()).entries(limit).await?;

        if entries.is_empty() {
            println!("Change queue is empty");
            return Ok(());
        }

        for entry in &entries {
            println!(
                "#{:<5} {:<10} {} change(s), created {}",
                entry.id,
                entry.status.to_string(),
                entry.changes.len(),
                entry.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            for change in &entry.changes {
                println!(
                    "       {} {}/{}",
                    change.operation, change.table_name, change.record_id
                );
            }
            if let Some(error) = &entry.error {
                println!("       error: {}", error);
            }
        }

        Ok(())
    }
}

fn build_engine(store: &LocalStore, config: &Config) -> Result<SyncEngine, SyncCommandError> {
    let remote = Arc::new(HttpRemoteStore::from_config(&config.sync)?);
    Ok(SyncEngine::new(store.clone(), remote, SyncStatusStore::new())
        .with_strategy(config.sync.replace_strategy))
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    SyncError(SyncError),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::SyncError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::SyncError(e) => Some(e),
        }
    }
}

impl From<SyncError> for SyncCommandError {
    fn from(e: SyncError) -> Self {
        SyncCommandError::SyncError(e)
    }
}
