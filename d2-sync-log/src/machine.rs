//! Job state machine
//!
//! A single log interleaves the output of every background job running on the
//! instance. Some lines can be attributed to a job through their section tag,
//! e.g.
//!
//! ```text
//! * INFO  2025-07-21T11:47:28,307 [META_DATA_SYNC aBcD9Zo0xrG] Process started
//! ```
//!
//! but low level errors and stack traces are untagged. Each job kind gets its
//! own machine that tracks at most one open job and attaches the untagged error
//! lines that show up while it is open.
//!
//! All kinds share the same transition function; what differs is the table of
//! trigger phrases in [`JobTriggers`].

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::import_summary::parse_import_summaries;
use crate::job::{CompletedJob, JobKind, OpenJob};
use crate::record::LogRecord;

const IMPORT_SUMMARY_BLOCK: &str = "ImportSummary{";
const CAUSED_BY_LINE: &str = "Caused by:";
const CAUSED_BY: &str = "Caused by";
const DETAIL: &str = "Detail: ";

/// Trigger phrases of one job kind. Matching is case-insensitive.
#[derive(Debug, Clone, Copy)]
pub struct JobTriggers {
    pub kind: JobKind,
    /// Tag that must appear as `[<TAG> ` for a trigger to count
    pub section: Option<&'static str>,
    pub open: &'static [&'static str],
    pub success: &'static [&'static str],
    pub failure: &'static [&'static str],
}

pub const AGGREGATED: JobTriggers = JobTriggers {
    kind: JobKind::Aggregated,
    section: Some("DATA_SYNC"),
    open: &["Starting DataValueSynchronization job"],
    success: &["Process completed after"],
    failure: &["DataValueSynchronization failed"],
};

pub const EVENT_PROGRAMS: JobTriggers = JobTriggers {
    kind: JobKind::EventPrograms,
    section: Some("EVENT_PROGRAMS_DATA_SYNC"),
    open: &["Starting Event programs data synchronization"],
    success: &[
        "Event programs data synchronization skipped",
        "Event programs data sync was successfully done",
    ],
    failure: &["Event programs data synchronization failed"],
};

pub const TRACKER_PROGRAMS: JobTriggers = JobTriggers {
    kind: JobKind::TrackerPrograms,
    section: Some("TRACKER_PROGRAMS_DATA_SYNC"),
    open: &["Starting Tracker programs data synchronization"],
    success: &[
        "Tracker programs data synchronization skipped",
        "Tracker programs data synchronization was successfully done",
    ],
    failure: &["Tracker programs data synchronization failed"],
};

pub const METADATA: JobTriggers = JobTriggers {
    kind: JobKind::Metadata,
    section: None,
    open: &["Metadata Sync cron Job started"],
    success: &["Metadata sync cron job ended"],
    failure: &[],
};

impl JobTriggers {
    pub fn for_kind(kind: JobKind) -> &'static JobTriggers {
        match kind {
            JobKind::Aggregated => &AGGREGATED,
            JobKind::EventPrograms => &EVENT_PROGRAMS,
            JobKind::TrackerPrograms => &TRACKER_PROGRAMS,
            JobKind::Metadata => &METADATA,
        }
    }
}

/// Accumulated state of one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserState {
    pub current: Option<OpenJob>,
    pub completed: Vec<CompletedJob>,
    pub last_processed: Option<NaiveDateTime>,
}

impl ParserState {
    fn add_errors(mut self, errors: impl IntoIterator<Item = String>) -> Self {
        if let Some(job) = self.current.as_mut() {
            job.errors.extend(errors);
        }
        self
    }

    /// Attaches a `Detail: ` line to the preceding `Caused by` error when there
    /// is one, otherwise records it as a new error.
    fn add_detail(mut self, text: &str) -> Self {
        if let Some(job) = self.current.as_mut() {
            match job.errors.last_mut() {
                Some(last) if last.contains(CAUSED_BY) => {
                    last.push_str(" - ");
                    last.push_str(text);
                }
                _ => job.errors.push(text.to_string()),
            }
        }
        self
    }

    fn close(mut self, success: bool, timestamp: Option<NaiveDateTime>) -> Self {
        if let Some(job) = self.current.take() {
            debug!(kind = %job.kind, success, "Closing sync job");
            self.completed.push(job.close(success, timestamp));
            if timestamp.is_some() {
                self.last_processed = timestamp;
            }
        }
        self
    }
}

/// Trigger table prepared for case-insensitive matching.
#[derive(Debug, Clone)]
pub struct JobMachine {
    kind: JobKind,
    section: Option<String>,
    section_marker: Option<String>,
    open: Vec<String>,
    success: Vec<String>,
    failure: Vec<String>,
}

impl JobMachine {
    pub fn new(triggers: &JobTriggers) -> Self {
        let lower = |phrases: &[&str]| -> Vec<String> {
            phrases.iter().map(|p| p.to_lowercase()).collect()
        };
        let section = triggers.section.map(|tag| tag.to_lowercase());

        Self {
            kind: triggers.kind,
            section_marker: section.as_ref().map(|tag| format!("[{tag} ")),
            section,
            open: lower(triggers.open),
            success: lower(triggers.success),
            failure: lower(triggers.failure),
        }
    }

    pub fn for_kind(kind: JobKind) -> Self {
        Self::new(JobTriggers::for_kind(kind))
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    fn in_section(&self, lower: &str) -> bool {
        match &self.section_marker {
            Some(marker) => lower.contains(marker.as_str()),
            None => true,
        }
    }

    fn matches(&self, phrases: &[String], lower: &str) -> bool {
        self.in_section(lower) && phrases.iter().any(|phrase| lower.contains(phrase.as_str()))
    }

    /// A record tagged with some other job's section is never attached to this
    /// machine's open job. Untagged records are.
    fn foreign_section(&self, text: &str) -> bool {
        let Some(own) = &self.section else {
            return false;
        };

        section_tag(text).is_some_and(|tag| !tag.eq_ignore_ascii_case(own))
    }

    /// Transition function: folds one record into the machine state.
    pub fn reduce(&self, state: ParserState, record: &LogRecord) -> ParserState {
        let text = record.text.as_str();
        let lower = text.to_lowercase();

        if self.matches(&self.open, &lower) {
            return self.open_job(state, record);
        }

        if state.current.is_none() || self.foreign_section(text) {
            return state;
        }

        if self.matches(&self.success, &lower) {
            state.close(true, record.timestamp)
        } else if self.matches(&self.failure, &lower) {
            state.close(false, record.timestamp)
        } else if text.contains(IMPORT_SUMMARY_BLOCK) {
            let errors = parse_import_summaries(text)
                .into_iter()
                .filter(|summary| summary.is_error() || summary.has_conflicts())
                .map(|summary| summary.format());
            state.add_errors(errors)
        } else if text.contains(CAUSED_BY_LINE) {
            state.add_errors([text.to_string()])
        } else if text.contains(DETAIL) {
            state.add_detail(text)
        } else {
            state
        }
    }

    fn open_job(&self, mut state: ParserState, record: &LogRecord) -> ParserState {
        if state.current.is_some() {
            debug!(kind = %self.kind, "Sync job already open, ignoring start line");
            return state;
        }

        match record.timestamp {
            Some(start) => {
                debug!(kind = %self.kind, %start, "Opening sync job");
                state.current = Some(OpenJob::new(self.kind, start));
            }
            None => {
                warn!(
                    kind = %self.kind,
                    text = %record.text,
                    "Log entry does not have a timestamp, cannot set start of sync job"
                );
            }
        }

        state
    }
}

/// Section tag of a record, `EVENT_PROGRAMS_DATA_SYNC` in
/// `[EVENT_PROGRAMS_DATA_SYNC xyz] message`.
fn section_tag(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('[')?;
    let (tag, _) = rest.split_once(' ')?;

    let is_tag = !tag.is_empty()
        && tag
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');

    is_tag.then_some(tag)
}
