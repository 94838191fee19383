use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Background synchronization jobs tracked in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "aggregatedData")]
    Aggregated,
    #[serde(rename = "eventProgramsData")]
    EventPrograms,
    #[serde(rename = "trackerProgramsData")]
    TrackerPrograms,
    #[serde(rename = "metadata")]
    Metadata,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::Aggregated,
        JobKind::EventPrograms,
        JobKind::TrackerPrograms,
        JobKind::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Aggregated => "aggregatedData",
            JobKind::EventPrograms => "eventProgramsData",
            JobKind::TrackerPrograms => "trackerProgramsData",
            JobKind::Metadata => "metadata",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job that has started and not yet finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenJob {
    pub kind: JobKind,
    pub start: NaiveDateTime,
    pub errors: Vec<String>,
}

impl OpenJob {
    pub fn new(kind: JobKind, start: NaiveDateTime) -> Self {
        Self {
            kind,
            start,
            errors: Vec::new(),
        }
    }

    /// Finishes the job. It is successful only if the closing line said so
    /// and nothing went wrong while it ran.
    pub fn close(self, success: bool, end: Option<NaiveDateTime>) -> CompletedJob {
        CompletedJob {
            kind: self.kind,
            success: success && self.errors.is_empty(),
            start: self.start,
            end: end.unwrap_or(self.start),
            errors: uniq(self.errors),
            suggestions: Vec::new(),
        }
    }
}

/// Report of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedJob {
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub success: bool,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub errors: Vec<String>,
    pub suggestions: Vec<String>,
}

impl CompletedJob {
    /// Returns the job with the given suggestions, deduplicated.
    pub fn with_suggestions(self, suggestions: Vec<String>) -> Self {
        Self {
            suggestions: uniq(suggestions),
            ..self
        }
    }
}

/// Removes duplicates keeping the first occurrence of each element.
pub fn uniq<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 16)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn uniq_keeps_first_occurrence() {
        assert_eq!(uniq(vec!["a", "b", "a"]), vec!["a", "b"]);
        assert_eq!(uniq(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(uniq(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn close_without_errors() {
        let job = OpenJob::new(JobKind::Metadata, ts(9)).close(true, Some(ts(10)));
        assert!(job.success);
        assert_eq!(job.start, ts(9));
        assert_eq!(job.end, ts(10));
    }

    #[test]
    fn close_with_errors_is_never_successful() {
        let mut job = OpenJob::new(JobKind::EventPrograms, ts(9));
        job.errors.push(String::from("boom"));
        job.errors.push(String::from("boom"));

        let job = job.close(true, None);
        assert!(!job.success);
        assert_eq!(job.end, ts(9));
        assert_eq!(job.errors, vec![String::from("boom")]);
    }

    #[test]
    fn kind_names() {
        assert_eq!(JobKind::EventPrograms.to_string(), "eventProgramsData");
        assert_eq!(
            serde_json::to_string(&JobKind::TrackerPrograms).unwrap(),
            r#""trackerProgramsData""#
        );
    }
}
