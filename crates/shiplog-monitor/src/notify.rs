use std::sync::Arc;

use async_trait::async_trait;
use shiplog_core::NewNotification;
use shiplog_db::Database;
use tracing::{info, warn};

/// Receives user-facing monitor events. Delivery must not fail the caller,
/// so implementations swallow and log their own errors.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification);
}

/// Appends notifications to the project's notification log.
pub struct DbNotifier {
    db: Arc<dyn Database>,
}

impl DbNotifier {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn notify(&self, notification: NewNotification) {
        match self.db.create_notification(&notification).await {
            Ok(saved) => info!(
                "notification {} for project {}: {}",
                saved.id, saved.project_id, saved.title
            ),
            Err(e) => warn!(
                "dropping notification '{}' for project {}: {e}",
                notification.title, notification.project_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiplog_core::project::CreateProject;
    use shiplog_core::NotificationKind;
    use shiplog_db::SqliteDatabase;

    #[tokio::test]
    async fn stores_notification() {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        let project = db
            .create_project(&CreateProject {
                name: "Shiplog".into(),
                description: String::new(),
                credential: "tok".into(),
                auto_generation: true,
                poll_interval_secs: None,
            })
            .await
            .unwrap();

        let notifier = DbNotifier::new(db.clone());
        notifier
            .notify(NewNotification::new(
                &project.id,
                NotificationKind::Info,
                "Hello",
                "world",
            ))
            .await;

        let stored = db.list_notifications(&project.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Hello");
        assert!(!stored[0].read);
    }

    #[tokio::test]
    async fn unknown_project_is_swallowed() {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        let notifier = DbNotifier::new(db.clone());
        notifier
            .notify(NewNotification::new(
                "missing",
                NotificationKind::Error,
                "Oops",
                "nobody home",
            ))
            .await;
        assert!(db.list_notifications("missing").await.unwrap().is_empty());
    }
}
