use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::DEFAULT_INTERVAL_SECS;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Token handed to the repository client. Never serialized outward.
    #[serde(default, skip_serializing)]
    pub credential: String,
    /// Resume the monitor for this project when the server starts.
    pub auto_generation: bool,
    pub poll_interval_secs: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn has_credential(&self) -> bool {
        !self.credential.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub credential: String,
    #[serde(default = "default_true")]
    pub auto_generation: bool,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl CreateProject {
    pub fn interval_or_default(&self) -> u64 {
        self.poll_interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub credential: Option<String>,
    pub auto_generation: Option<bool>,
    pub poll_interval_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_is_not_serialized() {
        let project = Project {
            id: "p1".into(),
            name: "Demo".into(),
            description: String::new(),
            credential: "ghp_secret".into(),
            auto_generation: true,
            poll_interval_secs: 300,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&project).unwrap();
        assert!(!json.contains("ghp_secret"));
        assert!(!json.contains("credential"));
    }

    #[test]
    fn create_project_defaults() {
        let input: CreateProject = serde_json::from_str(r#"{"name":"Demo"}"#).unwrap();
        assert!(input.auto_generation);
        assert_eq!(input.interval_or_default(), DEFAULT_INTERVAL_SECS);
        assert!(input.credential.is_empty());
    }
}
