use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use shiplog_db::{Database, SqliteDatabase};
use shiplog_monitor::{DbNotifier, GitHubClient, TaskRegistry};
use shiplog_server::config::ServerConfig;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    info!("shiplog-server starting");

    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open(&config.db_config())?);
    let client = Arc::new(GitHubClient::with_base_url(&config.github_api_url)?);
    info!("github api: {}", client.base_url());

    let registry = Arc::new(TaskRegistry::new(
        db.clone(),
        client,
        Arc::new(DbNotifier::new(db.clone())),
        config.min_interval,
    ));
    let state = shiplog_server::app_state(db, registry);
    shiplog_server::resume_monitors(&state).await?;

    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;
    info!("shiplog-server listening on http://{addr}");

    shiplog_server::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
        info!("shutting down");
    })
    .await
}
