//! LedgerPay platform server
//!
//! One binary runs the whole closed loop:
//!
//! - the HTTP API (checkout + leaderboard reads)
//! - the webhook worker delivering signed merchant callbacks
//! - the leaderboard aggregation and snapshot schedulers
//!
//! # Usage
//!
//! ```bash
//! # defaults, with DATABASE_URL / REDIS_URL from the environment
//! ledgerpay-server
//!
//! # API-only instance
//! ledgerpay-server --disable-workers
//! ```

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ledgerpay_api::{create_router, AppState};
use ledgerpay_db::Database;
use ledgerpay_leaderboard::worker::{
    enqueue_snapshots, enqueue_sync, spawn_analytics_worker, spawn_snapshot_worker,
};
use ledgerpay_notify::spawn_notify_worker;

use crate::config::ServerConfig;

/// LedgerPay server: payments, callbacks, and leaderboards
#[derive(Parser, Debug)]
#[command(name = "ledgerpay-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "LEDGERPAY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "LEDGERPAY_PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LEDGERPAY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "LEDGERPAY_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Leaderboard aggregation interval in seconds
    #[arg(long, env = "LEDGERPAY_AGGREGATE_INTERVAL")]
    aggregate_interval: Option<u64>,

    /// Snapshot interval in seconds
    #[arg(long, env = "LEDGERPAY_SNAPSHOT_INTERVAL")]
    snapshot_interval: Option<u64>,

    /// Run without background workers (API-only)
    #[arg(long, env = "LEDGERPAY_DISABLE_WORKERS")]
    disable_workers: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = build_config(args);

    init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting LedgerPay server"
    );

    let db = Arc::new(Database::connect(&config.database).await?);
    db.migrate().await?;

    let health = db.health_check().await?;
    anyhow::ensure!(health.healthy, "database health check failed");
    info!(postgres = health.postgres, redis = health.redis, "stores healthy");

    if config.jobs.disable_workers {
        info!("background workers disabled");
    } else {
        spawn_workers(db.clone(), &config);
    }

    let state = Arc::new(AppState::new(db));
    let app = create_router(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout()))
        .await?;

    info!("server shutdown complete");
    Ok(())
}

fn build_config(args: Args) -> ServerConfig {
    let mut config = ServerConfig::default();

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.database_url {
        config.database.postgres_url = url;
    }
    if let Some(url) = args.redis_url {
        config.database.redis_url = url;
    }
    if let Some(secs) = args.aggregate_interval {
        config.jobs.aggregate_interval_secs = secs;
    }
    if let Some(secs) = args.snapshot_interval {
        config.jobs.snapshot_interval_secs = secs;
    }
    config.jobs.disable_workers = args.disable_workers;
    config.logging.level = args.log_level;
    config.logging.format = args.log_format;

    config
}

fn init_logging(config: &config::LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);
    match config.format.as_str() {
        "json" => subscriber.with(fmt::layer().json().with_target(true)).init(),
        _ => subscriber.with(fmt::layer().pretty().with_target(true)).init(),
    }
}

/// Start the queue consumers and the schedulers that feed them.
fn spawn_workers(db: Arc<Database>, config: &ServerConfig) {
    spawn_notify_worker(db.clone());
    spawn_analytics_worker(db.clone());
    spawn_snapshot_worker(db.clone());
    info!("queue workers started");

    let aggregate_db = db.clone();
    let aggregate_interval = Duration::from_secs(config.jobs.aggregate_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(aggregate_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = enqueue_sync(&aggregate_db, &[]).await {
                error!(error = %err, "failed to enqueue leaderboard aggregation");
            }
        }
    });

    let snapshot_db = db;
    let snapshot_interval = Duration::from_secs(config.jobs.snapshot_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(snapshot_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = enqueue_snapshots(&snapshot_db).await {
                error!(error = %err, "failed to enqueue leaderboard snapshots");
            }
        }
    });

    info!(
        aggregate_interval_secs = config.jobs.aggregate_interval_secs,
        snapshot_interval_secs = config.jobs.snapshot_interval_secs,
        "leaderboard schedulers started"
    );
}

/// Wait for Ctrl+C or SIGTERM, then allow in-flight requests to finish.
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }

    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["ledgerpay-server", "--port", "9000", "--disable-workers"]);
        assert_eq!(args.port, Some(9000));
        assert!(args.disable_workers);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "ledgerpay-server",
            "--database-url",
            "postgresql://db/pay",
            "--aggregate-interval",
            "60",
        ]);
        let config = build_config(args);
        assert_eq!(config.database.postgres_url, "postgresql://db/pay");
        assert_eq!(config.jobs.aggregate_interval_secs, 60);
        assert_eq!(config.jobs.snapshot_interval_secs, 600);
    }
}
