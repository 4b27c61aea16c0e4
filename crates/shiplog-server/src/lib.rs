pub mod config;
mod routes;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use shiplog_core::MonitorConfig;
use shiplog_db::Database;
use shiplog_monitor::TaskRegistry;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

pub use routes::{build_router, AppState, InnerAppState};

pub fn app_state(db: Arc<dyn Database>, registry: Arc<TaskRegistry>) -> AppState {
    Arc::new(InnerAppState { db, registry })
}

/// Serve the API until `shutdown` resolves, then stop every monitor.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = state.registry.clone();
    let app = routes::build_router(state).layer(CorsLayer::permissive());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    registry.shutdown().await;
    Ok(())
}

/// Start monitors for projects with auto-generation on and a credential set.
/// Returns how many were started.
pub async fn resume_monitors(state: &AppState) -> Result<usize> {
    let min = state.registry.min_interval_secs();
    let mut started = 0;
    for project in state.db.list_projects().await? {
        if !project.auto_generation || !project.has_credential() {
            continue;
        }
        let config = MonitorConfig::new(project.poll_interval_secs.max(min));
        match state.registry.start(&project.id, config).await {
            Ok(()) => started += 1,
            Err(e) => warn!("not resuming monitor for project {}: {e}", project.id),
        }
    }
    info!("resumed {started} monitors");
    Ok(started)
}
