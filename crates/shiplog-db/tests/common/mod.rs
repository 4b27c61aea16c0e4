// Backend-agnostic integration tests for the Database trait.
//
// Each public async function accepts `&dyn Database` so the same assertions
// can run against any backend.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use shiplog_core::changelog::ChangelogEntry;
use shiplog_core::notification::{FailureKind, NewNotification, NotificationKind};
use shiplog_core::project::{CreateProject, UpdateProject};
use shiplog_core::repository::{ConnectRepository, RepoRef};
use shiplog_db::{Database, DbError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_project(name: &str) -> CreateProject {
    CreateProject {
        name: name.to_string(),
        description: String::new(),
        credential: "ghp_test".to_string(),
        auto_generation: true,
        poll_interval_secs: None,
    }
}

fn connect(project_id: &str, owner: &str, name: &str) -> ConnectRepository {
    ConnectRepository::new(project_id, &RepoRef::new(owner, name).unwrap())
}

fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

fn entry(version: &str, ids: &[u64], generated_at: DateTime<Utc>) -> ChangelogEntry {
    ChangelogEntry {
        version: version.to_string(),
        generated_at,
        lines: ids.iter().map(|id| format!("- change (#{id})")).collect(),
        change_request_ids: ids.iter().copied().collect(),
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Create, get, list and update a project.
pub async fn test_project_crud(db: &dyn Database) {
    let p = db.create_project(&make_project("Alpha")).await.unwrap();
    assert_eq!(p.name, "Alpha");
    assert_eq!(p.credential, "ghp_test");
    assert!(p.auto_generation);
    assert_eq!(p.poll_interval_secs, 300);

    let fetched = db.get_project(&p.id).await.unwrap();
    assert_eq!(fetched.id, p.id);

    db.create_project(&make_project("Beta")).await.unwrap();
    let all = db.list_projects().await.unwrap();
    let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);

    let updated = db
        .update_project(
            &p.id,
            &UpdateProject {
                credential: Some("ghp_rotated".into()),
                poll_interval_secs: Some(60),
                auto_generation: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.credential, "ghp_rotated");
    assert_eq!(updated.poll_interval_secs, 60);
    assert!(!updated.auto_generation);
    assert_eq!(updated.name, "Alpha");

    // empty update returns the project unchanged
    let same = db.update_project(&p.id, &UpdateProject::default()).await.unwrap();
    assert_eq!(same.poll_interval_secs, 60);
}

pub async fn test_project_not_found(db: &dyn Database) {
    let err = db.get_project("missing").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)), "got {err:?}");

    let err = db
        .update_project(
            "missing",
            &UpdateProject {
                name: Some("x".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

pub async fn test_connect_repository(db: &dyn Database) {
    let p = db.create_project(&make_project("Repos")).await.unwrap();

    let repo = db.connect_repository(&connect(&p.id, "octo", "widgets")).await.unwrap();
    assert_eq!(repo.project_id, p.id);
    assert_eq!(repo.full_name(), "octo/widgets");
    assert_eq!(repo.url, "https://github.com/octo/widgets");
    assert!(repo.last_watermark.is_none());

    let fetched = db.get_repository(&repo.id).await.unwrap();
    assert_eq!(fetched.id, repo.id);

    db.connect_repository(&connect(&p.id, "octo", "gadgets")).await.unwrap();
    let repos = db.list_repositories(&p.id).await.unwrap();
    assert_eq!(repos.len(), 2);
}

pub async fn test_connect_duplicate_rejected(db: &dyn Database) {
    let p = db.create_project(&make_project("Dupes")).await.unwrap();
    db.connect_repository(&connect(&p.id, "octo", "widgets")).await.unwrap();

    let err = db
        .connect_repository(&connect(&p.id, "octo", "widgets"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");

    // the same repository may be connected to a different project
    let other = db.create_project(&make_project("Other")).await.unwrap();
    db.connect_repository(&connect(&other.id, "octo", "widgets")).await.unwrap();
}

pub async fn test_connect_unknown_project(db: &dyn Database) {
    let err = db
        .connect_repository(&connect("nope", "octo", "widgets"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Changelog
// ---------------------------------------------------------------------------

/// Appends keep the history newest first and move the watermark.
pub async fn test_changelog_append_order(db: &dyn Database) {
    let p = db.create_project(&make_project("History")).await.unwrap();
    let repo = db.connect_repository(&connect(&p.id, "octo", "widgets")).await.unwrap();

    assert!(db.list_changelog(&repo.id).await.unwrap().is_empty());

    let first = entry("v1.0.0", &[1, 2], ts(10));
    let updated = db.append_changelog(&repo.id, &first, ts(9)).await.unwrap();
    assert_eq!(updated.last_watermark, Some(ts(9)));

    // same generated_at on purpose: ordering must follow insertion
    let second = entry("v1.0.1", &[3], ts(10));
    db.append_changelog(&repo.id, &second, ts(10)).await.unwrap();
    let third = entry("v1.0.2", &[4], ts(10));
    db.append_changelog(&repo.id, &third, ts(11)).await.unwrap();

    let history = db.list_changelog(&repo.id).await.unwrap();
    let versions: Vec<&str> = history.iter().map(|e| e.version.as_str()).collect();
    assert_eq!(versions, vec!["v1.0.2", "v1.0.1", "v1.0.0"]);
    assert_eq!(history[2], first);
    assert_eq!(history[2].change_request_ids, BTreeSet::from([1, 2]));

    let repo = db.get_repository(&repo.id).await.unwrap();
    assert_eq!(repo.last_watermark, Some(ts(11)));
}

pub async fn test_watermark_never_moves_back(db: &dyn Database) {
    let p = db.create_project(&make_project("Watermark")).await.unwrap();
    let repo = db.connect_repository(&connect(&p.id, "octo", "widgets")).await.unwrap();

    db.append_changelog(&repo.id, &entry("v1.0.0", &[1], ts(12)), ts(12))
        .await
        .unwrap();
    let updated = db
        .append_changelog(&repo.id, &entry("v1.0.1", &[2], ts(13)), ts(12) - Duration::hours(3))
        .await
        .unwrap();
    assert_eq!(updated.last_watermark, Some(ts(12)));
}

pub async fn test_append_unknown_repository(db: &dyn Database) {
    let err = db
        .append_changelog("missing", &entry("v1.0.0", &[1], ts(1)), ts(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub async fn test_notification_log(db: &dyn Database) {
    let p = db.create_project(&make_project("Notify")).await.unwrap();

    let ok = db
        .create_notification(&NewNotification::new(
            &p.id,
            NotificationKind::Success,
            "New Changelog Generated",
            "Generated v1.0.0 for octo/widgets with 2 new changes",
        ))
        .await
        .unwrap();
    assert!(!ok.read);
    assert!(ok.failure.is_none());

    let failed = db
        .create_notification(
            &NewNotification::new(
                &p.id,
                NotificationKind::Error,
                "Repository credential rejected",
                "octo/widgets: bad credentials",
            )
            .with_failure(FailureKind::Unauthorized),
        )
        .await
        .unwrap();
    assert_eq!(failed.failure, Some(FailureKind::Unauthorized));

    let listed = db.list_notifications(&p.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, failed.id);
    assert_eq!(listed[1].kind, NotificationKind::Success);

    let read = db.mark_notification_read(ok.id).await.unwrap();
    assert!(read.read);

    let err = db.mark_notification_read(9999).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)), "got {err:?}");
}

pub async fn test_notification_unknown_project(db: &dyn Database) {
    let err = db
        .create_notification(&NewNotification::new(
            "missing",
            NotificationKind::Info,
            "t",
            "m",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)), "got {err:?}");
}
