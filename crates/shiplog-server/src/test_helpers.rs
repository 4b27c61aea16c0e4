use std::sync::Arc;

use axum::Router;
use shiplog_core::monitor::MIN_INTERVAL_SECS;
use shiplog_db::{Database, SqliteDatabase};
use shiplog_monitor::{DbNotifier, MockRepositoryClient, TaskRegistry};
use tokio::net::TcpListener;

use crate::AppState;

/// In-memory SQLite state wired to a scripted repository client.
pub fn test_state() -> (AppState, Arc<MockRepositoryClient>) {
    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
    let client = Arc::new(MockRepositoryClient::new());
    let registry = Arc::new(TaskRegistry::new(
        db.clone(),
        client.clone(),
        Arc::new(DbNotifier::new(db.clone())),
        MIN_INTERVAL_SECS,
    ));
    (crate::app_state(db, registry), client)
}

pub async fn test_router() -> Router {
    let (state, _client) = test_state();
    crate::build_router(state)
}

/// A running test server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: Arc<MockRepositoryClient>,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn the API on a random port. `base_url` looks like
/// "http://127.0.0.1:12345".
pub async fn spawn_test_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (state, client) = test_state();
    let app = crate::build_router(state.clone());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base_url: format!("http://{addr}"),
        state,
        client,
        _handle: handle,
    }
}
