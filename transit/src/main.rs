#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::sync::Arc;
use std::time::Duration;

use args::Args;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use transit_billing::BillingService;
use transit_config::{Config, Environment};
use transit_db::postgres::{
    PgChannelRepository, PgTaskRepository, PgUserApiKeyRepository, PgUserRepository,
    run_migrations,
};
use transit_poller::TaskPoller;
use transit_server::{AppState, Server};
use transit_store::{AdmissionStore, BalanceStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    init_tracing(config.server.environment);
    tracing::info!(
        config_path = %args.config.display(),
        environment = ?config.server.environment,
        "starting transit"
    );

    // Durable store
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&config.database.dsn())
        .await?;
    run_migrations(&pool).await?;
    tracing::info!("database ready");

    let channels = Arc::new(PgChannelRepository::new(pool.clone()));
    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let tasks = Arc::new(PgTaskRepository::new(pool.clone()));
    let api_keys = Arc::new(PgUserApiKeyRepository::new(pool));

    // Counter and balance stores
    let admission = AdmissionStore::redis(&config.redis.url)?;
    let balances = BalanceStore::redis(&config.redis.url)?;
    let billing = BillingService::new(balances);

    let state = AppState::new(
        config.models.clone(),
        channels.clone(),
        users,
        tasks.clone(),
        api_keys,
        admission.clone(),
        billing.clone(),
        config.admin.token.clone(),
    );

    // Set up graceful shutdown
    let shutdown = CancellationToken::new();
    let shutdown_signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_signal_token.cancel();
    });

    // One poller per deployment; a second instance would duplicate
    // refunds and slot releases
    let poller = TaskPoller::new(
        tasks,
        channels,
        admission,
        billing,
        Duration::from_secs(config.poller.interval_secs),
        config.poller.batch_size,
    );
    let poller_handle = tokio::spawn(poller.run(shutdown.clone()));

    // Run server
    let server = Server::new(state, config.server.port);
    server.serve(shutdown.clone()).await?;

    shutdown.cancel();
    poller_handle.await.ok();

    tracing::info!("transit stopped");
    Ok(())
}

fn init_tracing(environment: Environment) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = match environment {
        Environment::Development => "debug",
        Environment::Production => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(environment == Environment::Development);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
