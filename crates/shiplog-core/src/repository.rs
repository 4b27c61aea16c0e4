use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedRepository {
    pub id: String,
    pub project_id: String,
    pub owner: String,
    pub name: String,
    pub url: String,
    /// Latest merge timestamp already folded into a changelog entry.
    pub last_watermark: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConnectedRepository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRepository {
    pub project_id: String,
    pub owner: String,
    pub name: String,
    pub url: String,
}

impl ConnectRepository {
    pub fn new(project_id: &str, repo: &RepoRef) -> Self {
        Self {
            project_id: project_id.to_string(),
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            url: repo.canonical_url(),
        }
    }
}

/// A validated GitHub owner/name pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Trims both parts, drops a trailing `.git` from the name and checks
    /// the characters GitHub allows.
    pub fn new(owner: &str, name: &str) -> Result<Self, CoreError> {
        let owner = owner.trim();
        let name = name.trim();
        let name = name.strip_suffix(".git").unwrap_or(name);

        if owner.is_empty() || name.is_empty() {
            return Err(CoreError::InvalidInput(
                "repository owner and name cannot be empty".into(),
            ));
        }
        if !owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CoreError::InvalidInput(format!(
                "invalid repository owner: {owner}"
            )));
        }
        if name == "." || name == ".." {
            return Err(CoreError::InvalidInput(format!(
                "invalid repository name: {name}"
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(CoreError::InvalidInput(format!(
                "invalid repository name: {name}"
            )));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Parse a GitHub repository URL.
    ///
    /// Supports:
    ///   https://github.com/owner/repo
    ///   https://github.com/owner/repo.git
    ///   https://www.github.com/owner/repo/
    ///   git@github.com:owner/repo.git
    pub fn parse_url(repo_url: &str) -> Result<Self, CoreError> {
        let repo_url = repo_url.trim();
        let invalid = || {
            CoreError::InvalidInput(format!(
                "invalid GitHub repository URL: {repo_url} (expected https://github.com/owner/repo)"
            ))
        };

        if let Some(path) = repo_url.strip_prefix("git@github.com:") {
            let mut parts = path.split('/').filter(|s| !s.is_empty());
            let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(invalid());
            };
            return Self::new(owner, name);
        }

        let parsed = url::Url::parse(repo_url).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid());
        }
        match parsed.host_str() {
            Some("github.com") | Some("www.github.com") => {}
            _ => {
                return Err(CoreError::InvalidInput(format!(
                    "only GitHub repositories are supported: {repo_url}"
                )))
            }
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|s| !s.is_empty())
            .collect();
        match segments.as_slice() {
            [owner, name] => Self::new(owner, name),
            _ => Err(invalid()),
        }
    }

    pub fn canonical_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_https_url() {
        let repo = RepoRef::parse_url("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!(repo.owner, "rust-lang");
        assert_eq!(repo.name, "cargo");
        assert_eq!(repo.canonical_url(), "https://github.com/rust-lang/cargo");
    }

    #[test]
    fn parse_url_strips_git_suffix_and_trailing_slash() {
        let repo = RepoRef::parse_url("https://github.com/user/repo.git").unwrap();
        assert_eq!(repo.name, "repo");
        let repo = RepoRef::parse_url("https://www.github.com/user/repo/").unwrap();
        assert_eq!(repo.to_string(), "user/repo");
    }

    #[test]
    fn parse_ssh_url() {
        let repo = RepoRef::parse_url("git@github.com:user/repo.git").unwrap();
        assert_eq!(repo.to_string(), "user/repo");
    }

    #[test]
    fn rejects_other_hosts() {
        let err = RepoRef::parse_url("https://gitlab.com/user/repo").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert!(err.to_string().contains("only GitHub"));
    }

    #[test]
    fn rejects_wrong_path_shape() {
        assert!(RepoRef::parse_url("https://github.com/user").is_err());
        assert!(RepoRef::parse_url("https://github.com/user/repo/tree/main").is_err());
        assert!(RepoRef::parse_url("not a url").is_err());
    }

    #[test]
    fn new_rejects_bad_characters() {
        assert!(RepoRef::new("", "repo").is_err());
        assert!(RepoRef::new("user", " ").is_err());
        assert!(RepoRef::new("us er", "repo").is_err());
        assert!(RepoRef::new("user", "re/po").is_err());
        assert!(RepoRef::new("user", "..").is_err());
        assert_eq!(RepoRef::new(" user ", "my_repo.rs").unwrap().name, "my_repo.rs");
    }
}
