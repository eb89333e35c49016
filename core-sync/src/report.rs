//! Sync units, per-unit outcomes and run reports.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EntityKind;

/// One entity to mirror.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncUnit {
    pub title: String,
    pub kind: EntityKind,
}

impl SyncUnit {
    pub fn new(title: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            title: title.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    NoChange,
    Ignored,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::NoChange => "no_change",
            SyncStatus::Ignored => "ignored",
            SyncStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    /// Failure cause or skip reason, for humans only.
    pub detail: Option<String>,
}

impl SyncOutcome {
    pub fn synced() -> Self {
        Self {
            status: SyncStatus::Synced,
            detail: None,
        }
    }

    pub fn no_change() -> Self {
        Self {
            status: SyncStatus::NoChange,
            detail: None,
        }
    }

    pub fn ignored() -> Self {
        Self {
            status: SyncStatus::Ignored,
            detail: Some("title is in the ignore list".to_string()),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == SyncStatus::Failed
    }

    /// Ignored or unchanged.
    pub fn is_skip(&self) -> bool {
        matches!(self.status, SyncStatus::Ignored | SyncStatus::NoChange)
    }
}

/// `(title, outcome)` pairs produced by one pass.
pub type PassResults = Vec<(String, SyncOutcome)>;

/// Summary of a two-pass batch run.
///
/// `succeeded + failed == total` and `still_failed_titles.len() == failed`
/// whenever the retry pass covered every title that failed the first pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Ignored or unchanged units, counted inside `succeeded`.
    pub skipped_within_succeeded: u64,
    pub still_failed_titles: Vec<String>,
}

impl BatchReport {
    /// Reduce the first pass and the retry pass into a report.
    pub fn from_passes(first: &[(String, SyncOutcome)], retry: &[(String, SyncOutcome)]) -> Self {
        let successes = |pass: &[(String, SyncOutcome)]| {
            pass.iter().filter(|(_, outcome)| !outcome.is_failed()).count() as u64
        };
        let skips = |pass: &[(String, SyncOutcome)]| {
            pass.iter().filter(|(_, outcome)| outcome.is_skip()).count() as u64
        };

        let still_failed_titles: Vec<String> = retry
            .iter()
            .filter(|(_, outcome)| outcome.is_failed())
            .map(|(title, _)| title.clone())
            .collect();

        Self {
            total: first.len() as u64,
            succeeded: successes(first) + successes(retry),
            failed: still_failed_titles.len() as u64,
            skipped_within_succeeded: skips(first) + skips(retry),
            still_failed_titles,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Summary of a recent-changes poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollReport {
    /// Titles handed to the engine, failures included.
    pub processed: u64,
    /// Duplicate or ignore-listed entries.
    pub skipped: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(items: &[(&str, SyncOutcome)]) -> PassResults {
        items
            .iter()
            .map(|(title, outcome)| (title.to_string(), outcome.clone()))
            .collect()
    }

    #[test]
    fn test_report_counts_retry_successes() {
        let first = pass(&[
            ("A", SyncOutcome::synced()),
            ("B", SyncOutcome::failed("HTTP 503")),
            ("C", SyncOutcome::no_change()),
            ("D", SyncOutcome::failed("timeout")),
        ]);
        let retry = pass(&[
            ("B", SyncOutcome::synced()),
            ("D", SyncOutcome::failed("timeout")),
        ]);

        let report = BatchReport::from_passes(&first, &retry);
        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped_within_succeeded, 1);
        assert_eq!(report.still_failed_titles, vec!["D".to_string()]);
        assert_eq!(report.succeeded + report.failed, report.total);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_report_without_failures() {
        let first = pass(&[("A", SyncOutcome::ignored()), ("B", SyncOutcome::synced())]);
        let report = BatchReport::from_passes(&first, &[]);

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.skipped_within_succeeded, 1);
        assert!(report.is_clean());
        assert!(report.still_failed_titles.is_empty());
    }

    #[test]
    fn test_retry_skip_counts_as_skip() {
        let first = pass(&[("A", SyncOutcome::failed("HTTP 502"))]);
        let retry = pass(&[("A", SyncOutcome::no_change())]);

        let report = BatchReport::from_passes(&first, &retry);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped_within_succeeded, 1);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_empty_run() {
        assert_eq!(BatchReport::from_passes(&[], &[]), BatchReport::default());
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(SyncOutcome::failed("x").is_failed());
        assert!(SyncOutcome::ignored().is_skip());
        assert!(!SyncOutcome::synced().is_skip());
        assert_eq!(SyncStatus::NoChange.to_string(), "no_change");
    }
}
