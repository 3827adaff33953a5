//! # orderflowd: orderflow automation daemon
//!
//! Composition root that wires all adapters together and runs the engine.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters) and the action sink
//! - Start the delayed action worker
//! - Feed trigger events read from stdin to the automation engine (optional)
//! - Handle graceful shutdown (Ctrl-C)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer, no domain logic belongs here.

mod config;
mod ingest;

use std::sync::Arc;

use anyhow::Context;
use orderflow_adapter_storage_sqlite_sqlx::{
    Config as StorageConfig, SqliteAutomationRuleRepository, SqliteDelayedActionStore,
    SqliteRuleLogRepository,
};
use orderflow_adapter_virtual::VirtualActionSink;
use orderflow_app::automation_engine::AutomationEngine;
use orderflow_app::delayed_action_worker::DelayedActionWorker;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).context("invalid logging filter")?,
        )
        .init();

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
        max_connections: config.database.max_connections,
    }
    .build()
    .await
    .context("failed to open database")?;
    let pool = db.pool().clone();

    // Adapters
    let rules = Arc::new(SqliteAutomationRuleRepository::new(pool.clone()));
    let delayed = Arc::new(SqliteDelayedActionStore::new(pool.clone()));
    let logs = Arc::new(SqliteRuleLogRepository::new(pool));
    let sink = Arc::new(VirtualActionSink::default());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Background worker
    let worker = config.worker.enabled.then(|| {
        DelayedActionWorker::new(
            Arc::clone(&rules),
            Arc::clone(&delayed),
            Arc::clone(&sink),
            config.worker.batch_size,
        )
        .start(config.worker.poll_interval(), shutdown_rx.clone())
    });

    // Trigger intake
    let engine = AutomationEngine::new(rules, delayed, logs, sink);
    let intake = config.ingest.stdin.then(|| {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            ingest::run(BufReader::new(tokio::io::stdin()), &engine, shutdown).await
        })
    });

    tracing::info!(
        worker = config.worker.enabled,
        stdin = config.ingest.stdin,
        "orderflowd running, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");
    shutdown_tx.send_replace(true);

    if let Some(handle) = worker {
        handle.await.context("delayed action worker panicked")?;
    }
    if let Some(handle) = intake {
        handle.await.context("trigger intake panicked")?;
    }
    db.close().await;

    Ok(())
}
