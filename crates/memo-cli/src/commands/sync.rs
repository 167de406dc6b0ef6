use std::sync::Arc;
use std::time::Duration;

use memo_core::db::{SqliteSyncSettingsRepository, SyncSettingsRepository};
use memo_core::remote::HttpRemoteClient;
use memo_core::sync::{SyncCoordinator, SyncEngine};
use memo_core::Error;

use crate::error::CliError;

use super::CommandContext;

/// Run one manual sync cycle and report the outcome.
pub async fn run_sync(ctx: &CommandContext, server: &str) -> Result<(), CliError> {
    let client = HttpRemoteClient::new(server)?;
    let engine = SyncEngine::new(Arc::clone(&ctx.db), client);
    let coordinator = SyncCoordinator::new(engine, ctx.user_id);

    match coordinator.sync_now().await {
        Ok(outcome) => {
            println!(
                "Sync completed: {} pushed, {} deleted, {} pulled",
                outcome.pushed, outcome.deleted, outcome.pulled
            );
            Ok(())
        }
        Err(error) => Err(categorize_sync_error(error)),
    }
}

pub fn run_autosync_on(ctx: &CommandContext) -> Result<(), CliError> {
    SqliteSyncSettingsRepository::new(&ctx.db).set_auto_sync_enabled(ctx.user_id, true)?;
    println!("Auto-sync enabled");
    Ok(())
}

pub fn run_autosync_off(ctx: &CommandContext) -> Result<(), CliError> {
    SqliteSyncSettingsRepository::new(&ctx.db).set_auto_sync_enabled(ctx.user_id, false)?;
    println!("Auto-sync disabled");
    Ok(())
}

pub fn run_autosync_status(ctx: &CommandContext) -> Result<(), CliError> {
    let enabled = SqliteSyncSettingsRepository::new(&ctx.db).auto_sync_enabled(ctx.user_id)?;
    println!(
        "Auto-sync is {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Run the background sync loop in the foreground until Ctrl-C.
pub async fn run_watch(
    ctx: &CommandContext,
    server: &str,
    interval: Option<u64>,
) -> Result<(), CliError> {
    let settings = SqliteSyncSettingsRepository::new(&ctx.db);
    if !settings.auto_sync_enabled(ctx.user_id)? {
        println!("Auto-sync is disabled; run `memo autosync on` first.");
        return Ok(());
    }

    let client = HttpRemoteClient::new(server)?;
    let engine = SyncEngine::new(Arc::clone(&ctx.db), client);
    let mut coordinator = SyncCoordinator::new(engine, ctx.user_id);
    if let Some(seconds) = interval {
        coordinator = coordinator.with_sync_interval(Duration::from_secs(seconds.max(1)));
    }

    // One immediate cycle, then the periodic loop takes over.
    coordinator.sync_silent().await;
    coordinator.start_periodic();
    println!("Watching for changes; press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    coordinator.stop();
    println!("\nStopped.");
    Ok(())
}

/// Map an engine failure to the single user-facing category the manual
/// sync command reports.
fn categorize_sync_error(error: Error) -> CliError {
    if error.is_connectivity() {
        return CliError::Offline;
    }
    if let Error::Api { status, message } = &error {
        if *status >= 500 {
            return CliError::ServerError(format!("{message} ({status})"));
        }
    }
    CliError::SyncFailed(error.to_string())
}
