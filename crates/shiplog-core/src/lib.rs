pub mod change_request;
pub mod changelog;
pub mod error;
pub mod monitor;
pub mod notification;
pub mod project;
pub mod repository;
pub mod version;

pub use change_request::ChangeRequestSummary;
pub use changelog::{ChangelogBuilder, ChangelogEntry};
pub use error::CoreError;
pub use monitor::{MonitorConfig, MonitorState, MonitorStatus};
pub use notification::{FailureKind, NewNotification, Notification, NotificationKind};
pub use project::Project;
pub use repository::{ConnectedRepository, RepoRef};
pub use version::Version;
