use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(NotificationKind::Success),
            "error" => Some(NotificationKind::Error),
            "info" => Some(NotificationKind::Info),
            "warning" => Some(NotificationKind::Warning),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a repository check failed. Lets consumers tell an expired credential
/// apart from an outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    Unauthorized,
    Transient,
    MalformedResponse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Transient => "transient",
            FailureKind::MalformedResponse => "malformed_response",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "invalid_input" => Some(FailureKind::InvalidInput),
            "unauthorized" => Some(FailureKind::Unauthorized),
            "transient" => Some(FailureKind::Transient),
            "malformed_response" => Some(FailureKind::MalformedResponse),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub project_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub failure: Option<FailureKind>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub project_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub failure: Option<FailureKind>,
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    pub fn new(
        project_id: &str,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            kind,
            title: title.into(),
            message: message.into(),
            failure: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_failure(mut self, failure: FailureKind) -> Self {
        self.failure = Some(failure);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            NotificationKind::Success,
            NotificationKind::Error,
            NotificationKind::Info,
            NotificationKind::Warning,
        ] {
            assert_eq!(NotificationKind::parse_str(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::parse_str("fatal"), None);
    }

    #[test]
    fn failure_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::MalformedResponse).unwrap();
        assert_eq!(json, "\"malformed_response\"");
    }
}
