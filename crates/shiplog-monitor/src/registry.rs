use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use shiplog_core::{ChangelogEntry, MonitorConfig, MonitorState, MonitorStatus};
use shiplog_db::Database;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::MonitorError;
use crate::locks::KeyedLocks;
use crate::notify::Notifier;
use crate::repo_client::RepositoryClient;
use crate::task::{
    check_repository, update_status, MonitorContext, MonitorTask, SharedStatus, TaskStatus,
};

/// Result of an on-demand generation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerateOutcome {
    Generated { entry: ChangelogEntry },
    NoNewItems,
}

struct TaskEntry {
    running: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    status: SharedStatus,
    interval_secs: u64,
}

/// Owns every project's monitor task and its running flag.
///
/// Start and stop of one project are serialized; the task table lock is
/// only held for map access, so `status()` never waits on a sweep.
pub struct TaskRegistry {
    ctx: Arc<MonitorContext>,
    min_interval_secs: u64,
    tasks: Mutex<HashMap<String, TaskEntry>>,
    lifecycle: KeyedLocks,
}

impl TaskRegistry {
    pub fn new(
        db: Arc<dyn Database>,
        client: Arc<dyn RepositoryClient>,
        notifier: Arc<dyn Notifier>,
        min_interval_secs: u64,
    ) -> Self {
        Self {
            ctx: Arc::new(MonitorContext {
                db,
                client,
                notifier,
                repo_locks: KeyedLocks::default(),
            }),
            min_interval_secs,
            tasks: Mutex::new(HashMap::new()),
            lifecycle: KeyedLocks::default(),
        }
    }

    pub fn min_interval_secs(&self) -> u64 {
        self.min_interval_secs
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch the monitor for `project_id`, replacing any running one.
    pub async fn start(&self, project_id: &str, config: MonitorConfig) -> Result<(), MonitorError> {
        config.validate(self.min_interval_secs)?;
        self.check_startable(project_id).await?;

        let _guard = self.lifecycle.lock(project_id).await;
        self.launch_locked(project_id, config).await;
        Ok(())
    }

    /// Replace the monitor with one using `config`, but only if one is
    /// running. Check and relaunch happen under the project's lifecycle
    /// lock, so a concurrent `stop` is never undone. Returns whether a
    /// monitor was restarted.
    pub async fn restart_if_running(
        &self,
        project_id: &str,
        config: MonitorConfig,
    ) -> Result<bool, MonitorError> {
        config.validate(self.min_interval_secs)?;

        let _guard = self.lifecycle.lock(project_id).await;
        if !self.is_running(project_id) {
            return Ok(false);
        }
        self.check_startable(project_id).await?;
        self.launch_locked(project_id, config).await;
        Ok(true)
    }

    async fn check_startable(&self, project_id: &str) -> Result<(), MonitorError> {
        let project = self.ctx.db.get_project(project_id).await?;
        if !project.has_credential() {
            return Err(MonitorError::InvalidInput(format!(
                "project {project_id} has no repository credential"
            )));
        }
        Ok(())
    }

    /// Caller holds the project's lifecycle lock.
    async fn launch_locked(&self, project_id: &str, config: MonitorConfig) {
        if self.stop_locked(project_id).await {
            info!("replacing monitor for project {project_id}");
        }

        let (running_tx, running_rx) = watch::channel(true);
        let status: SharedStatus = Arc::new(Mutex::new(TaskStatus::running()));
        let task = MonitorTask::new(
            project_id,
            config.interval(),
            running_rx,
            status.clone(),
            self.ctx.clone(),
        );
        let handle = tokio::spawn(task.run());

        self.tasks().insert(
            project_id.to_string(),
            TaskEntry {
                running: running_tx,
                handle: Some(handle),
                status,
                interval_secs: config.interval_secs,
            },
        );
    }

    /// Stop the monitor and wait for it to exit. `false` if none was registered.
    pub async fn stop(&self, project_id: &str) -> bool {
        let _guard = self.lifecycle.lock(project_id).await;
        self.stop_locked(project_id).await
    }

    async fn stop_locked(&self, project_id: &str) -> bool {
        let handle = {
            let mut tasks = self.tasks();
            let Some(entry) = tasks.get_mut(project_id) else {
                return false;
            };
            update_status(&entry.status, |s| s.state = MonitorState::Stopping);
            // Err only means the task is already gone.
            let _ = entry.running.send(false);
            entry.handle.take()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("monitor for project {project_id} ended abnormally: {e}");
            }
        }
        self.tasks().remove(project_id);
        info!("monitor for project {project_id} stopped");
        true
    }

    /// Stop every registered monitor.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.tasks().keys().cloned().collect();
        for id in ids {
            self.stop(&id).await;
        }
    }

    pub fn is_running(&self, project_id: &str) -> bool {
        self.status()
            .get(project_id)
            .is_some_and(|s| s.running)
    }

    /// Snapshot of every registered monitor, keyed by project id.
    pub fn status(&self) -> BTreeMap<String, MonitorStatus> {
        self.tasks()
            .iter()
            .map(|(project_id, entry)| {
                let task = entry
                    .status
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                let status = MonitorStatus {
                    project_id: project_id.clone(),
                    running: *entry.running.borrow() && task.state == MonitorState::Running,
                    state: task.state,
                    interval_secs: entry.interval_secs,
                    last_check: task.last_check,
                    sweeps: task.sweeps,
                };
                (project_id.clone(), status)
            })
            .collect()
    }

    /// Check one repository right now. Errors go to the caller rather than
    /// into the notification log.
    pub async fn generate_now(
        &self,
        project_id: &str,
        repository_id: &str,
    ) -> Result<GenerateOutcome, MonitorError> {
        let project = self.ctx.db.get_project(project_id).await?;
        let repo = self.ctx.db.get_repository(repository_id).await?;
        if repo.project_id != project.id {
            return Err(MonitorError::NotFound(format!(
                "repository {repository_id} in project {project_id}"
            )));
        }

        Ok(match check_repository(&self.ctx, &project, &repo.id).await? {
            Some(entry) => GenerateOutcome::Generated { entry },
            None => GenerateOutcome::NoNewItems,
        })
    }
}
