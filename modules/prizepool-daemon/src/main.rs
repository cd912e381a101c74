use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prizepool_common::{Config, EntitlementPolicy};
use prizepool_engine::{CompletionPoller, LogPlatform, restore_surfaces};
use prizepool_store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prizepool=info".parse()?))
        .init();

    info!("Prizepool daemon starting...");

    // Load config and policy
    let config = Config::from_env();
    config.log_redacted();

    // Parse the policy up front so a bad file fails the boot, not the
    // first join.
    let policy = EntitlementPolicy::load(&config.policy_path)?;
    info!(
        giveaway_bonuses = policy.giveaway_bonus.len(),
        lottery_bonuses = policy.lottery_bonus.len(),
        blacklisted = policy.blacklist.len(),
        "Entitlement policy loaded"
    );

    // Connect to Postgres and run migrations (idempotent)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(pool));
    store.migrate().await?;

    // No messaging binding wired in yet; surface operations are logged.
    let platform = Arc::new(LogPlatform::new());

    // Re-bind interactive surfaces for events that were open at shutdown
    let restored = restore_surfaces(store.as_ref(), platform.as_ref()).await?;
    info!(restored, "Startup recovery complete");

    let poller = Arc::new(CompletionPoller::new(
        store,
        platform,
        Duration::from_secs(config.poll_interval_secs),
        config.retention_days,
    ));
    let poller_task = tokio::spawn(poller.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping poller");
    poller_task.abort();
    Ok(())
}
