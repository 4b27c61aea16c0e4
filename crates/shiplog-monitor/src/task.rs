use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use shiplog_core::change_request::latest_merge;
use shiplog_core::changelog::unseen_changes;
use shiplog_core::{
    ChangelogBuilder, ChangelogEntry, ConnectedRepository, FailureKind, MonitorState,
    NewNotification, NotificationKind, Project,
};
use shiplog_db::Database;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::MonitorError;
use crate::locks::KeyedLocks;
use crate::notify::Notifier;
use crate::repo_client::RepositoryClient;

pub const SUCCESS_TITLE: &str = "New Changelog Generated";
pub const UNAUTHORIZED_TITLE: &str = "Repository credential rejected";
pub const FAILURE_TITLE: &str = "Changelog check failed";

/// Collaborators shared by every monitor task and `generate_now`.
pub(crate) struct MonitorContext {
    pub(crate) db: Arc<dyn Database>,
    pub(crate) client: Arc<dyn RepositoryClient>,
    pub(crate) notifier: Arc<dyn Notifier>,
    /// Serializes checks of the same repository.
    pub(crate) repo_locks: KeyedLocks,
}

/// Mutable part of a task's status, shared with the registry.
#[derive(Debug, Clone)]
pub(crate) struct TaskStatus {
    pub(crate) state: MonitorState,
    pub(crate) last_check: Option<DateTime<Utc>>,
    pub(crate) sweeps: u64,
}

impl TaskStatus {
    pub(crate) fn running() -> Self {
        Self {
            state: MonitorState::Running,
            last_check: None,
            sweeps: 0,
        }
    }
}

pub(crate) type SharedStatus = Arc<Mutex<TaskStatus>>;

pub(crate) fn update_status(status: &SharedStatus, f: impl FnOnce(&mut TaskStatus)) {
    let mut guard = status.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard);
}

/// Periodic changelog check for one project.
pub(crate) struct MonitorTask {
    project_id: String,
    interval: Duration,
    running: watch::Receiver<bool>,
    status: SharedStatus,
    ctx: Arc<MonitorContext>,
}

impl MonitorTask {
    pub(crate) fn new(
        project_id: &str,
        interval: Duration,
        running: watch::Receiver<bool>,
        status: SharedStatus,
        ctx: Arc<MonitorContext>,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            interval,
            running,
            status,
            ctx,
        }
    }

    /// Sleep, sweep, repeat until the running flag drops.
    pub(crate) async fn run(mut self) {
        info!(
            "monitor for project {} started (every {}s)",
            self.project_id,
            self.interval.as_secs()
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = self.running.changed() => {
                    if changed.is_err() || !*self.running.borrow_and_update() {
                        break;
                    }
                    continue;
                }
            }
            if !*self.running.borrow() {
                break;
            }

            self.sweep().await;
            update_status(&self.status, |s| {
                s.last_check = Some(Utc::now());
                s.sweeps += 1;
            });
        }
        update_status(&self.status, |s| s.state = MonitorState::Terminated);
        info!("monitor for project {} terminated", self.project_id);
    }

    async fn sweep(&self) {
        let ctx = &self.ctx;
        let loaded = async {
            let project = ctx.db.get_project(&self.project_id).await?;
            let repos = ctx.db.list_repositories(&self.project_id).await?;
            Ok::<_, MonitorError>((project, repos))
        }
        .await;
        let (project, repos) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("monitor {}: could not load project: {e}", self.project_id);
                ctx.notifier
                    .notify(
                        NewNotification::new(
                            &self.project_id,
                            NotificationKind::Error,
                            FAILURE_TITLE,
                            format!("Could not load project: {e}"),
                        )
                        .with_failure(e.failure_kind()),
                    )
                    .await;
                return;
            }
        };

        debug!(
            "monitor {}: checking {} repositories via {}",
            project.id,
            repos.len(),
            ctx.client.name()
        );
        for repo in &repos {
            match check_repository(ctx, &project, &repo.id).await {
                Ok(Some(entry)) => {
                    ctx.notifier.notify(success_notification(&project, repo, &entry)).await;
                }
                Ok(None) => debug!("monitor {}: {} has nothing new", project.id, repo.full_name()),
                Err(e) => {
                    if matches!(&e, MonitorError::Fetch(f) if f.is_transient()) {
                        warn!(
                            "monitor {}: {} failed, retrying next tick: {e}",
                            project.id,
                            repo.full_name()
                        );
                    } else {
                        error!("monitor {}: {} failed: {e}", project.id, repo.full_name());
                    }
                    ctx.notifier.notify(failure_notification(&project, repo, &e)).await;
                }
            }
        }
    }
}

/// Fetch, deduplicate and record one repository. `Ok(None)` when nothing
/// new was merged since the last entry.
pub(crate) async fn check_repository(
    ctx: &MonitorContext,
    project: &Project,
    repository_id: &str,
) -> Result<Option<ChangelogEntry>, MonitorError> {
    let _guard = ctx.repo_locks.lock(repository_id).await;

    // Re-read under the guard; a concurrent check may have moved the watermark.
    let repo = ctx.db.get_repository(repository_id).await?;
    let history = ctx.db.list_changelog(&repo.id).await?;
    let fetched = ctx
        .client
        .fetch_merged_since(&repo.owner, &repo.name, &project.credential, repo.last_watermark)
        .await?;

    let fresh = unseen_changes(fetched, &history);
    let Some(watermark) = latest_merge(&fresh) else {
        return Ok(None);
    };

    let entry = ChangelogBuilder::build(&fresh, &history, Utc::now());
    ctx.db.append_changelog(&repo.id, &entry, watermark).await?;
    info!(
        "generated {} for {} ({} changes)",
        entry.version,
        repo.full_name(),
        entry.change_request_ids.len()
    );
    Ok(Some(entry))
}

fn success_notification(
    project: &Project,
    repo: &ConnectedRepository,
    entry: &ChangelogEntry,
) -> NewNotification {
    NewNotification::new(
        &project.id,
        NotificationKind::Success,
        SUCCESS_TITLE,
        format!(
            "Generated {} for {} with {} new changes",
            entry.version,
            repo.full_name(),
            entry.change_request_ids.len()
        ),
    )
}

fn failure_notification(
    project: &Project,
    repo: &ConnectedRepository,
    err: &MonitorError,
) -> NewNotification {
    let failure = err.failure_kind();
    let title = match failure {
        FailureKind::Unauthorized => UNAUTHORIZED_TITLE,
        _ => FAILURE_TITLE,
    };
    NewNotification::new(
        &project.id,
        NotificationKind::Error,
        title,
        format!("{}: {err}", repo.full_name()),
    )
    .with_failure(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DbNotifier;
    use crate::repo_client::{FetchError, MockRepositoryClient};
    use chrono::TimeZone;
    use shiplog_core::project::CreateProject;
    use shiplog_core::repository::ConnectRepository;
    use shiplog_core::{ChangeRequestSummary, RepoRef};
    use shiplog_db::SqliteDatabase;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    struct Fixture {
        db: Arc<dyn Database>,
        client: Arc<MockRepositoryClient>,
        ctx: MonitorContext,
        project: Project,
        repo: ConnectedRepository,
    }

    async fn fixture() -> Fixture {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        let client = Arc::new(MockRepositoryClient::new());
        let project = db
            .create_project(&CreateProject {
                name: "Shiplog".into(),
                description: String::new(),
                credential: "ghp_test".into(),
                auto_generation: true,
                poll_interval_secs: None,
            })
            .await
            .unwrap();
        let repo = db
            .connect_repository(&ConnectRepository::new(
                &project.id,
                &RepoRef::new("octo", "widgets").unwrap(),
            ))
            .await
            .unwrap();
        let ctx = MonitorContext {
            db: db.clone(),
            client: client.clone(),
            notifier: Arc::new(DbNotifier::new(db.clone())),
            repo_locks: KeyedLocks::default(),
        };
        Fixture {
            db,
            client,
            ctx,
            project,
            repo,
        }
    }

    #[tokio::test]
    async fn first_check_creates_initial_version() {
        let f = fixture().await;
        f.client.push_ok(
            "octo/widgets",
            vec![
                ChangeRequestSummary::new(42, "Fix crash", at(2, 10)),
                ChangeRequestSummary::new(41, "Add feature", at(1, 10)),
            ],
        );

        let entry = check_repository(&f.ctx, &f.project, &f.repo.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.version, "v1.0.0");
        assert_eq!(entry.lines, vec!["- Fix crash (#42)", "- Add feature (#41)"]);

        let repo = f.db.get_repository(&f.repo.id).await.unwrap();
        assert_eq!(repo.last_watermark, Some(at(2, 10)));
        assert_eq!(f.client.calls()[0].credential, "ghp_test");
        assert_eq!(f.client.calls()[0].since, None);
    }

    #[tokio::test]
    async fn second_check_passes_watermark_and_bumps_patch() {
        let f = fixture().await;
        f.client
            .push_ok("octo/widgets", vec![ChangeRequestSummary::new(1, "One", at(1, 9))]);
        f.client
            .push_ok("octo/widgets", vec![ChangeRequestSummary::new(2, "Two", at(3, 9))]);

        check_repository(&f.ctx, &f.project, &f.repo.id).await.unwrap();
        let entry = check_repository(&f.ctx, &f.project, &f.repo.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.version, "v1.0.1");
        assert_eq!(f.client.calls()[1].since, Some(at(1, 9)));
        assert_eq!(f.db.list_changelog(&f.repo.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn boundary_items_are_not_repeated() {
        let f = fixture().await;
        let boundary = ChangeRequestSummary::new(7, "Edge", at(5, 12));
        f.client.push_ok("octo/widgets", vec![boundary.clone()]);
        // Inclusive query returns the watermark item again.
        f.client.push_ok("octo/widgets", vec![boundary]);

        assert!(check_repository(&f.ctx, &f.project, &f.repo.id)
            .await
            .unwrap()
            .is_some());
        assert!(check_repository(&f.ctx, &f.project, &f.repo.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(f.db.list_changelog(&f.repo.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn nothing_new_writes_nothing() {
        let f = fixture().await;
        assert!(check_repository(&f.ctx, &f.project, &f.repo.id)
            .await
            .unwrap()
            .is_none());
        let repo = f.db.get_repository(&f.repo.id).await.unwrap();
        assert!(repo.last_watermark.is_none());
        assert!(f.db.list_changelog(&f.repo.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_leaves_state_untouched() {
        let f = fixture().await;
        f.client
            .push_err("octo/widgets", FetchError::Transient("503".into()));
        let err = check_repository(&f.ctx, &f.project, &f.repo.id)
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Transient);
        assert!(f.db.list_changelog(&f.repo.id).await.unwrap().is_empty());
    }

    #[test]
    fn unauthorized_gets_distinct_title() {
        let project = Project {
            id: "p1".into(),
            name: "Shiplog".into(),
            description: String::new(),
            credential: String::new(),
            auto_generation: true,
            poll_interval_secs: 300,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let repo = ConnectedRepository {
            id: "r1".into(),
            project_id: "p1".into(),
            owner: "octo".into(),
            name: "widgets".into(),
            url: "https://github.com/octo/widgets".into(),
            last_watermark: None,
            created_at: Utc::now(),
        };

        let n = failure_notification(
            &project,
            &repo,
            &MonitorError::Fetch(FetchError::Unauthorized("401".into())),
        );
        assert_eq!(n.title, UNAUTHORIZED_TITLE);
        assert_eq!(n.failure, Some(FailureKind::Unauthorized));
        assert!(n.message.starts_with("octo/widgets: "));

        let n = failure_notification(
            &project,
            &repo,
            &MonitorError::Fetch(FetchError::RateLimited("429".into())),
        );
        assert_eq!(n.title, FAILURE_TITLE);
        assert_eq!(n.failure, Some(FailureKind::Transient));
    }
}
