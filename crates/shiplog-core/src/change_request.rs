use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A merged change request as reported by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestSummary {
    pub number: u64,
    pub title: String,
    pub merged_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl ChangeRequestSummary {
    pub fn new(number: u64, title: impl Into<String>, merged_at: DateTime<Utc>) -> Self {
        Self {
            number,
            title: title.into(),
            merged_at,
            url: None,
            author: None,
        }
    }
}

/// Sort newest merge first; ties broken by the higher number.
pub fn sort_newest_first(items: &mut [ChangeRequestSummary]) {
    items.sort_by(|a, b| {
        b.merged_at
            .cmp(&a.merged_at)
            .then_with(|| b.number.cmp(&a.number))
    });
}

/// Latest merge timestamp among `items`, if any.
pub fn latest_merge(items: &[ChangeRequestSummary]) -> Option<DateTime<Utc>> {
    items.iter().map(|c| c.merged_at).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sorts_by_merge_time_then_number() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut items = vec![
            ChangeRequestSummary::new(1, "a", t1),
            ChangeRequestSummary::new(3, "c", t1),
            ChangeRequestSummary::new(2, "b", t2),
        ];
        sort_newest_first(&mut items);
        let numbers: Vec<u64> = items.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![2, 3, 1]);
        assert_eq!(latest_merge(&items), Some(t2));
        assert_eq!(latest_merge(&[]), None);
    }
}
