//! Derived views over the loaded record list (search, date, user and status
//! filters plus starred-first ordering).

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::{NotificationId, NotificationRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    /// Anything not explicitly marked read.
    Pending,
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, record: &NotificationRecord) -> bool {
        match self {
            Self::All => true,
            Self::Completed => record.is_completed(),
            Self::Pending => !record.is_completed(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" | "done" => Ok(Self::Completed),
            "pending" | "open" => Ok(Self::Pending),
            other => Err(Error::validation(format!(
                "unknown status filter '{other}' (expected all, completed or pending)"
            ))),
        }
    }
}

/// Criteria for [`filtered_sorted`]. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    /// Case-insensitive substring of the full name.
    pub name_query: Option<String>,
    /// Inclusive lower bound on the occurrence date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the occurrence date.
    pub to: Option<NaiveDate>,
    pub entered_by: Option<String>,
    pub status: StatusFilter,
}

impl NotificationFilter {
    #[must_use]
    pub fn matches(&self, record: &NotificationRecord) -> bool {
        self.matches_name(record)
            && self.matches_dates(record)
            && self.matches_entered_by(record)
            && self.status.matches(record)
    }

    fn matches_name(&self, record: &NotificationRecord) -> bool {
        let query = normalize_query(self.name_query.as_deref());
        if query.is_empty() {
            return true;
        }
        record
            .full_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(&query))
    }

    fn matches_dates(&self, record: &NotificationRecord) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = record.occurs_on() else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    fn matches_entered_by(&self, record: &NotificationRecord) -> bool {
        let Some(wanted) = self
            .entered_by
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            return true;
        };
        record
            .entered_by
            .as_deref()
            .is_some_and(|value| value.trim() == wanted)
    }
}

/// Filter `records`, then move starred records to the front.
///
/// The sort is stable and keyed on priority membership only, so backend
/// order is preserved within the starred and unstarred groups.
#[must_use]
pub fn filtered_sorted(
    records: &[NotificationRecord],
    priority_ids: &BTreeSet<NotificationId>,
    filter: &NotificationFilter,
) -> Vec<NotificationRecord> {
    let mut matching = records
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect::<Vec<_>>();
    matching.sort_by_key(|record| !priority_ids.contains(&record.id));
    matching
}

/// Sorted, deduplicated "entered by" names.
#[must_use]
pub fn collect_entered_by(records: &[NotificationRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.entered_by.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Calendar dates on which at least one record occurs.
#[must_use]
pub fn dates_with_records(records: &[NotificationRecord]) -> BTreeSet<NaiveDate> {
    records
        .iter()
        .filter_map(NotificationRecord::occurs_on)
        .collect()
}

/// Records occurring on `date`, in list order.
#[must_use]
pub fn records_on(records: &[NotificationRecord], date: NaiveDate) -> Vec<NotificationRecord> {
    records
        .iter()
        .filter(|record| record.occurs_on() == Some(date))
        .cloned()
        .collect()
}

fn normalize_query(raw: Option<&str>) -> String {
    raw.unwrap_or_default().trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(id: NotificationId, name: &str, when: &str, user: &str, done: bool) -> NotificationRecord {
        NotificationRecord {
            id,
            full_name: Some(name.to_string()),
            occurs_at: Some(when.to_string()),
            entered_by: Some(user.to_string()),
            is_read: Some(done),
            ..Default::default()
        }
    }

    fn sample() -> Vec<NotificationRecord> {
        vec![
            record(1, "Ada Lovelace", "2025-03-10T09:00:00Z", "Salih", false),
            record(2, "Alan Turing", "2025-03-12T14:00:00Z", "Merve", true),
            record(3, "Grace Hopper", "2025-03-12T16:30:00Z", "Salih", false),
            record(4, "Ada Yonath", "2025-04-01T08:00:00Z", "Merve", false),
        ]
    }

    fn ids(records: &[NotificationRecord]) -> Vec<NotificationId> {
        records.iter().map(|record| record.id).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_filter_keeps_backend_order() {
        let result = filtered_sorted(&sample(), &BTreeSet::new(), &NotificationFilter::default());
        assert_eq!(ids(&result), vec![1, 2, 3, 4]);
    }

    #[test]
    fn starred_records_move_first_preserving_relative_order() {
        let priorities = [4, 2].into_iter().collect();
        let result = filtered_sorted(&sample(), &priorities, &NotificationFilter::default());
        assert_eq!(ids(&result), vec![2, 4, 1, 3]);
    }

    #[test]
    fn name_query_is_case_insensitive_substring() {
        let filter = NotificationFilter {
            name_query: Some("  aDa ".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filtered_sorted(&sample(), &BTreeSet::new(), &filter)), vec![1, 4]);
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let filter = NotificationFilter {
            from: Some(date(2025, 3, 10)),
            to: Some(date(2025, 3, 12)),
            ..Default::default()
        };
        assert_eq!(ids(&filtered_sorted(&sample(), &BTreeSet::new(), &filter)), vec![1, 2, 3]);
    }

    #[test]
    fn date_range_excludes_records_without_time() {
        let mut records = sample();
        records[0].occurs_at = None;
        let filter = NotificationFilter {
            from: Some(date(2025, 1, 1)),
            ..Default::default()
        };
        assert_eq!(ids(&filtered_sorted(&records, &BTreeSet::new(), &filter)), vec![2, 3, 4]);
    }

    #[test]
    fn status_and_user_filters_combine() {
        let pending_by_salih = NotificationFilter {
            entered_by: Some("Salih".to_string()),
            status: StatusFilter::Pending,
            ..Default::default()
        };
        assert_eq!(
            ids(&filtered_sorted(&sample(), &BTreeSet::new(), &pending_by_salih)),
            vec![1, 3]
        );

        let completed = NotificationFilter {
            status: StatusFilter::Completed,
            ..Default::default()
        };
        assert_eq!(ids(&filtered_sorted(&sample(), &BTreeSet::new(), &completed)), vec![2]);
    }

    #[test]
    fn unread_flag_missing_counts_as_pending() {
        let mut records = sample();
        records[1].is_read = None;
        assert!(StatusFilter::Pending.matches(&records[1]));
        assert!(!StatusFilter::Completed.matches(&records[1]));
    }

    #[test]
    fn filtering_twice_yields_identical_order() {
        let priorities = [3].into_iter().collect();
        let filter = NotificationFilter {
            name_query: Some("a".to_string()),
            ..Default::default()
        };
        let first = filtered_sorted(&sample(), &priorities, &filter);
        let second = filtered_sorted(&sample(), &priorities, &filter);
        assert_eq!(first, second);
    }

    #[test]
    fn status_filter_parses_user_input() {
        assert_eq!("Completed".parse::<StatusFilter>().unwrap(), StatusFilter::Completed);
        assert_eq!(" pending ".parse::<StatusFilter>().unwrap(), StatusFilter::Pending);
        assert!("later".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn calendar_helpers_group_by_date() {
        let records = sample();
        assert_eq!(
            collect_entered_by(&records),
            vec!["Merve".to_string(), "Salih".to_string()]
        );
        assert_eq!(
            dates_with_records(&records).into_iter().collect::<Vec<_>>(),
            vec![date(2025, 3, 10), date(2025, 3, 12), date(2025, 4, 1)]
        );
        assert_eq!(ids(&records_on(&records, date(2025, 3, 12))), vec![2, 3]);
    }
}
