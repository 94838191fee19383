//! Rotated log file set
//!
//! DHIS2 writes to a live `dhis.log` and rotates older content into
//! `dhis.log.1`, `dhis.log.2`, ... This module discovers those files and
//! exposes them as one ordered stream of [`LogRecord`]s.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::Skip;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::{LogError, Result};
use crate::record::LogRecord;

/// Default name of the live log file.
pub const DEFAULT_LIVE_FILE: &str = "dhis.log";

/// A logs folder with one live file and zero or more rotated files.
#[derive(Debug, Clone)]
pub struct LogFileSet {
    folder: PathBuf,
    live_name: String,
}

impl LogFileSet {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            live_name: String::from(DEFAULT_LIVE_FILE),
        }
    }

    /// Use a different live file name (rotated files are `<name>.<N>`).
    pub fn with_live_name(mut self, name: impl Into<String>) -> Self {
        self.live_name = name.into();
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Returns the file paths in reading order: rotated files by ascending
    /// ordinal, then the live file.
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        let live = self.folder.join(&self.live_name);
        if !live.is_file() {
            return Err(LogError::MissingLogFile { path: live });
        }

        let entries = std::fs::read_dir(&self.folder).map_err(|source| LogError::Io {
            path: self.folder.clone(),
            source,
        })?;

        let mut rotated: Vec<(u64, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LogError::Io {
                path: self.folder.clone(),
                source,
            })?;

            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            if let Some(ordinal) = self.rotation_ordinal(file_name) {
                rotated.push((ordinal, entry.path()));
            }
        }

        rotated.sort_by_key(|(ordinal, _)| *ordinal);

        let mut paths: Vec<PathBuf> = rotated.into_iter().map(|(_, path)| path).collect();
        paths.push(live);
        Ok(paths)
    }

    /// Parses `<live>.<N>` into `N`.
    fn rotation_ordinal(&self, file_name: &str) -> Option<u64> {
        let suffix = file_name
            .strip_prefix(self.live_name.as_str())?
            .strip_prefix('.')?;

        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        suffix.parse().ok()
    }

    /// Opens a stream over every record of the file set.
    pub fn records(&self) -> Result<Records> {
        let paths = self.paths()?;
        let files = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        info!(%files, "Reading logs");
        Ok(Records::new(paths))
    }

    /// Opens a stream over the records that follow the `since` cutoff.
    ///
    /// Everything up to and including the last record whose timestamp is not
    /// after `since` is dropped; every record after it is kept, framed or not.
    pub fn records_since(&self, since: Option<NaiveDateTime>) -> Result<Skip<Records>> {
        let skip = match since {
            Some(since) => {
                info!(%since, "Parsing logs since checkpoint");
                cutoff(self.records()?, since)?
            }
            None => 0,
        };

        debug!(skip, "Records dropped by cutoff");
        Ok(self.records()?.skip(skip))
    }
}

/// Number of leading records to drop so that the stream starts right after the
/// last record timestamped at or before `since`.
pub fn cutoff<I>(records: I, since: NaiveDateTime) -> Result<usize>
where
    I: IntoIterator<Item = Result<LogRecord>>,
{
    let mut skip = 0;

    for (index, record) in records.into_iter().enumerate() {
        let record = record?;
        if record.timestamp.is_some_and(|timestamp| timestamp <= since) {
            skip = index + 1;
        }
    }

    Ok(skip)
}

/// Streaming reader over a sequence of log files.
pub struct Records {
    pending: VecDeque<PathBuf>,
    current: Option<(PathBuf, BufReader<File>)>,
    buf: Vec<u8>,
}

impl Records {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            pending: paths.into(),
            current: None,
            buf: Vec::with_capacity(1024),
        }
    }

    fn open_next(&mut self) -> Option<Result<()>> {
        let path = self.pending.pop_front()?;
        debug!(path = %path.display(), "Opening log file");

        match File::open(&path) {
            Ok(file) => {
                self.current = Some((path, BufReader::new(file)));
                Some(Ok(()))
            }
            Err(source) => {
                self.pending.clear();
                Some(Err(LogError::Io { path, source }))
            }
        }
    }
}

impl Iterator for Records {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some((path, reader)) = self.current.as_mut() else {
                if let Err(e) = self.open_next()? {
                    return Some(Err(e));
                }
                continue;
            };

            self.buf.clear();
            match reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.current = None;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.buf);
                    return Some(Ok(LogRecord::parse(line.trim())));
                }
                Err(source) => {
                    let path = path.clone();
                    self.current = None;
                    self.pending.clear();
                    return Some(Err(LogError::Io { path, source }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 16)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn record(timestamp: Option<NaiveDateTime>, text: &str) -> Result<LogRecord> {
        Ok(LogRecord {
            timestamp,
            text: text.to_string(),
        })
    }

    #[test]
    fn rotation_ordinal() {
        let set = LogFileSet::new("/tmp");
        assert_eq!(set.rotation_ordinal("dhis.log.1"), Some(1));
        assert_eq!(set.rotation_ordinal("dhis.log.12"), Some(12));
        assert_eq!(set.rotation_ordinal("dhis.log"), None);
        assert_eq!(set.rotation_ordinal("dhis.log."), None);
        assert_eq!(set.rotation_ordinal("dhis.log.1.gz"), None);
        assert_eq!(set.rotation_ordinal("dhis.logs.1"), None);
        assert_eq!(set.rotation_ordinal("other.log.1"), None);
    }

    #[test]
    fn cutoff_without_matching_records() {
        let records = vec![record(Some(ts(10, 0)), "a"), record(None, "b")];
        assert_eq!(cutoff(records, ts(9, 0)).unwrap(), 0);
    }

    #[test]
    fn cutoff_drops_unframed_records_before_cutoff() {
        let records = vec![
            record(Some(ts(9, 0)), "a"),
            record(None, "trace"),
            record(Some(ts(9, 30)), "b"),
            record(None, "trace"),
            record(Some(ts(10, 0)), "c"),
            record(None, "trace"),
        ];
        assert_eq!(cutoff(records, ts(9, 30)).unwrap(), 3);
    }

    #[test]
    fn cutoff_uses_last_record_at_or_before_since() {
        // Out of order streams: the last old record wins.
        let records = vec![
            record(Some(ts(11, 0)), "newer"),
            record(Some(ts(8, 0)), "older"),
            record(Some(ts(12, 0)), "newest"),
        ];
        assert_eq!(cutoff(records, ts(9, 0)).unwrap(), 2);
    }

    #[test]
    fn cutoff_propagates_errors() {
        let records = vec![
            record(Some(ts(9, 0)), "a"),
            Err(LogError::MissingLogFile {
                path: PathBuf::from("/nope"),
            }),
        ];
        assert!(cutoff(records, ts(9, 0)).is_err());
    }
}
