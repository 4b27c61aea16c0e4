use std::fmt;

use serde::{Deserialize, Serialize};

/// A `vMAJOR.MINOR.PATCH` changelog version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Version given to the first entry of a repository.
    pub const INITIAL: Version = Version::new(1, 0, 0);

    /// Version used when the previous entry cannot be parsed.
    pub const LEGACY_FALLBACK: Version = Version::new(1, 0, 1);

    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `v1.2.3` (the leading `v` is optional). Anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        let mut parts = s.split('.');
        let major = parse_component(parts.next()?)?;
        let minor = parse_component(parts.next()?)?;
        let patch = parse_component(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }

    pub fn next_patch(&self) -> Option<Self> {
        Some(Self::new(self.major, self.minor, self.patch.checked_add(1)?))
    }

    /// Version following `previous`, the newest entry's version string.
    pub fn after(previous: Option<&str>) -> Self {
        match previous {
            None => Self::INITIAL,
            Some(prev) => Self::parse(prev)
                .and_then(|v| v.next_patch())
                .unwrap_or(Self::LEGACY_FALLBACK),
        }
    }
}

fn parse_component(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}
