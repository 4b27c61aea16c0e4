//! Changelog monitoring: repository clients, the per-project monitor task
//! and the registry that owns those tasks.

pub mod error;
mod locks;
pub mod notify;
pub mod registry;
pub mod repo_client;
mod task;

pub use error::MonitorError;
pub use notify::{DbNotifier, Notifier};
pub use registry::{GenerateOutcome, TaskRegistry};
pub use repo_client::{FetchError, GitHubClient, MockRepositoryClient, RepositoryClient};
pub use task::{FAILURE_TITLE, SUCCESS_TITLE, UNAUTHORIZED_TITLE};
