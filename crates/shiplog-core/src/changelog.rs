use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChangeRequestSummary, Version};

/// One generated changelog release. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub lines: Vec<String>,
    pub change_request_ids: BTreeSet<u64>,
}

impl ChangelogEntry {
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} ({})\n\n",
            self.version,
            self.generated_at.format("%Y-%m-%d")
        );
        for line in &self.lines {
            let _ = writeln!(out, "{line}");
        }
        out
    }
}

/// Turns a batch of merged change requests into the next changelog entry.
///
/// Pure: the same changes, history and timestamp always give the same entry.
pub struct ChangelogBuilder;

impl ChangelogBuilder {
    /// `prior` is the repository's history, newest first. `changes` keep the
    /// order the repository client returned (newest merge first).
    pub fn build(
        changes: &[ChangeRequestSummary],
        prior: &[ChangelogEntry],
        generated_at: DateTime<Utc>,
    ) -> ChangelogEntry {
        ChangelogEntry {
            version: Self::next_version(prior),
            generated_at,
            lines: changes.iter().map(Self::line).collect(),
            change_request_ids: changes.iter().map(|c| c.number).collect(),
        }
    }

    pub fn next_version(prior: &[ChangelogEntry]) -> String {
        Version::after(prior.first().map(|e| e.version.as_str())).to_string()
    }

    pub fn line(change: &ChangeRequestSummary) -> String {
        format!("- {} (#{})", change.title, change.number)
    }
}

/// Drop change requests already recorded in `history`.
///
/// The hosting query is inclusive at the watermark, so the items merged at
/// exactly that instant come back on the next fetch.
pub fn unseen_changes(
    fetched: Vec<ChangeRequestSummary>,
    history: &[ChangelogEntry],
) -> Vec<ChangeRequestSummary> {
    let seen: HashSet<u64> = history
        .iter()
        .flat_map(|e| e.change_request_ids.iter().copied())
        .collect();
    fetched
        .into_iter()
        .filter(|c| !seen.contains(&c.number))
        .collect()
}
