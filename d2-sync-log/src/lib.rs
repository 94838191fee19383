//! DHIS2 sync-job log parsing
//!
//! This crate turns the DHIS2 server log (`dhis.log` and its rotated siblings)
//! into reports of the background synchronization jobs that ran on the
//! instance.
//!
//! ## Key Components
//!
//! - **Record**: tokenizes raw log lines into timestamped records
//! - **Files**: reads the rotated log file set as a single record stream
//! - **Import summaries**: extracts the `ImportSummary{...}` blocks DHIS2 embeds in log lines
//! - **Machine**: per job kind state machine folding records into completed jobs
//! - **Report**: runs the four machines over a stream and aggregates their output
//! - **Checkpoint**: persisted last-processed timestamp for incremental runs
//!
//! ## Usage
//!
//! ```no_run
//! use d2_sync_log::{LogFileSet, LogParser};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let parser = LogParser::new(LogFileSet::new("/opt/dhis2/logs"));
//! let report = parser.parse(None)?;
//!
//! for job in &report.jobs {
//!     println!("{} success={} errors={}", job.kind, job.success, job.errors.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod error;
pub mod files;
pub mod import_summary;
pub mod job;
pub mod machine;
pub mod record;
pub mod report;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, FileCheckpointStore};
pub use error::{LogError, Result};
pub use files::LogFileSet;
pub use import_summary::{ImportSummary, parse_import_summaries};
pub use job::{CompletedJob, JobKind, OpenJob, uniq};
pub use machine::{JobMachine, JobTriggers, ParserState};
pub use record::LogRecord;
pub use report::{LogParser, Reducers, SyncReport, reduce_records};
