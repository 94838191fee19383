//! Report aggregation
//!
//! Sync jobs run in parallel on the server, so every job kind is reduced in
//! isolation over the same record stream and the results are merged once the
//! stream is exhausted.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::files::LogFileSet;
use crate::job::{CompletedJob, JobKind};
use crate::machine::{JobMachine, ParserState};
use crate::record::LogRecord;

/// Jobs found in one parsing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub jobs: Vec<CompletedJob>,
    /// Timestamp to resume from in the next run
    pub last_processed: NaiveDateTime,
}

/// The four job machines and their states, fed in lockstep.
#[derive(Debug, Clone)]
pub struct Reducers {
    machines: Vec<(JobMachine, ParserState)>,
}

impl Default for Reducers {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducers {
    pub fn new() -> Self {
        Self {
            machines: JobKind::ALL
                .into_iter()
                .map(|kind| (JobMachine::for_kind(kind), ParserState::default()))
                .collect(),
        }
    }

    /// Feeds one record to every machine.
    pub fn reduce(mut self, record: &LogRecord) -> Self {
        for (machine, state) in self.machines.iter_mut() {
            *state = machine.reduce(std::mem::take(state), record);
        }
        self
    }

    /// Latest close timestamp seen by any machine.
    pub fn last_processed(&self) -> Option<NaiveDateTime> {
        self.machines
            .iter()
            .filter_map(|(_, state)| state.last_processed)
            .max()
    }

    /// Merges the completed jobs in kind order. Jobs still open are dropped.
    pub fn finish(self, since: Option<NaiveDateTime>) -> SyncReport {
        let last_processed = self
            .last_processed()
            .or(since)
            .unwrap_or_else(|| Local::now().naive_local());

        let mut jobs = Vec::new();
        for (machine, state) in self.machines {
            if let Some(open) = state.current {
                debug!(kind = %machine.kind(), start = %open.start, "Sync job still running, not reported");
            }
            jobs.extend(state.completed);
        }

        SyncReport {
            jobs,
            last_processed,
        }
    }
}

/// Folds a record stream into a report.
pub fn reduce_records<I>(records: I, since: Option<NaiveDateTime>) -> Result<SyncReport>
where
    I: IntoIterator<Item = Result<LogRecord>>,
{
    let mut reducers = Reducers::new();
    for record in records {
        reducers = reducers.reduce(&record?);
    }
    Ok(reducers.finish(since))
}

/// Parses the sync job reports out of a DHIS2 logs folder.
#[derive(Debug, Clone)]
pub struct LogParser {
    files: LogFileSet,
}

impl LogParser {
    pub fn new(files: LogFileSet) -> Self {
        Self { files }
    }

    /// Parses the logs, starting right after `since` when given.
    pub fn parse(&self, since: Option<NaiveDateTime>) -> Result<SyncReport> {
        let records = self.files.records_since(since)?;
        let report = reduce_records(records, since)?;

        info!(
            jobs = report.jobs.len(),
            last_processed = %report.last_processed,
            "Parsed sync jobs from logs"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> SyncReport {
        let records = lines.iter().map(|line| Ok(LogRecord::parse(line)));
        reduce_records(records, None).unwrap()
    }

    #[test]
    fn interleaved_jobs() {
        let report = parse(&[
            "* INFO 2025-07-16T09:00:00,000 [EVENT_PROGRAMS_DATA_SYNC a] Starting Event programs data synchronization job",
            "* INFO 2025-07-16T09:00:01,000 [TRACKER_PROGRAMS_DATA_SYNC b] Starting Tracker programs data synchronization job",
            "* INFO 2025-07-16T09:00:02,000 [EVENT_PROGRAMS_DATA_SYNC a] Event programs data sync was successfully done",
            "* ERROR 2025-07-16T09:00:03,000 [TRACKER_PROGRAMS_DATA_SYNC b] Tracker programs data synchronization failed",
        ]);

        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.jobs[0].kind, JobKind::EventPrograms);
        assert!(report.jobs[0].success);
        assert_eq!(report.jobs[1].kind, JobKind::TrackerPrograms);
        assert!(!report.jobs[1].success);
        assert_eq!(
            report.last_processed.to_string(),
            "2025-07-16 09:00:03"
        );
    }

    #[test]
    fn untagged_errors_reach_every_open_job() {
        let report = parse(&[
            "* INFO 2025-07-16T09:00:00,000 [EVENT_PROGRAMS_DATA_SYNC a] Starting Event programs data synchronization job",
            "* INFO 2025-07-16T09:00:00,500 [META_DATA_SYNC m] Metadata Sync cron Job started",
            "Caused by: java.net.ConnectException: Connection refused",
            "* INFO 2025-07-16T09:00:02,000 [EVENT_PROGRAMS_DATA_SYNC a] Event programs data synchronization failed",
            "* INFO 2025-07-16T09:00:03,000 [META_DATA_SYNC m] Metadata sync cron job ended",
        ]);

        assert_eq!(report.jobs.len(), 2);
        for job in &report.jobs {
            assert!(!job.success);
            assert_eq!(
                job.errors,
                vec![String::from("Caused by: java.net.ConnectException: Connection refused")]
            );
        }
    }

    #[test]
    fn open_jobs_are_not_reported() {
        let report = parse(&[
            "* INFO 2025-07-16T09:00:00,000 Metadata Sync cron Job started",
        ]);
        assert!(report.jobs.is_empty());
    }

    #[test]
    fn checkpoint_falls_back_to_since() {
        let since = NaiveDateTime::parse_from_str("2025-07-16 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let report = reduce_records(Vec::new(), Some(since)).unwrap();
        assert_eq!(report.last_processed, since);
    }
}
