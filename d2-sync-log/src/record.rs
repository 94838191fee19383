use chrono::NaiveDateTime;
use tracing::warn;

/// Timestamp layout of framed lines: `2025-07-16T09:04:50,123`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S,%3f";

/// Marker that starts every line written by the DHIS2 logger.
const FRAME_MARKER: char = '*';

/// One tokenized log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Present only for framed lines with a parseable timestamp
    pub timestamp: Option<NaiveDateTime>,
    /// Message text; the whole line for unframed lines
    pub text: String,
}

impl LogRecord {
    /// Record without a timestamp holding the line verbatim.
    pub fn unframed(line: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            text: line.into(),
        }
    }

    /// Tokenizes a single newline-stripped log line.
    ///
    /// Framed lines look like:
    ///
    /// ```text
    /// * INFO  2025-07-16T09:04:50,123 [EVENT_PROGRAMS_DATA_SYNC xyz] Starting ...
    /// ```
    ///
    /// The level and timestamp are consumed and the rest of the tokens are
    /// joined back with single spaces. Lines that start with the marker but
    /// cannot be parsed are kept as unframed records, never dropped.
    pub fn parse(line: &str) -> Self {
        if !line.starts_with(FRAME_MARKER) {
            return Self::unframed(line);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            warn!(line, "Cannot parse log line");
            return Self::unframed(line);
        }

        match NaiveDateTime::parse_from_str(parts[2], TIMESTAMP_FORMAT) {
            Ok(timestamp) => Self {
                timestamp: Some(timestamp),
                text: parts[3..].join(" "),
            },
            Err(e) => {
                warn!(line, error = %e, "Invalid timestamp in log line");
                Self::unframed(line)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 16)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
    }

    #[test]
    fn framed_line() {
        let record = LogRecord::parse(
            "* INFO  2025-07-16T09:04:50,123 [EVENT_PROGRAMS_DATA_SYNC xyz] Starting job",
        );
        assert_eq!(record.timestamp, Some(at(9, 4, 50, 123)));
        assert_eq!(record.text, "[EVENT_PROGRAMS_DATA_SYNC xyz] Starting job");
    }

    #[test]
    fn framed_line_collapses_whitespace() {
        let record = LogRecord::parse("* WARN 2025-07-16T10:00:00,000   a\t b   c");
        assert_eq!(record.timestamp, Some(at(10, 0, 0, 0)));
        assert_eq!(record.text, "a b c");
    }

    #[test]
    fn unframed_line_is_verbatim() {
        let line = "Caused by: org.postgresql.util.PSQLException: ERROR:  duplicate key";
        assert_eq!(LogRecord::parse(line), LogRecord::unframed(line));
    }

    #[test]
    fn framed_line_with_too_few_tokens() {
        let line = "* INFO 2025-07-16T09:04:50,123";
        assert_eq!(LogRecord::parse(line), LogRecord::unframed(line));
    }

    #[test]
    fn framed_line_with_invalid_timestamp() {
        let line = "* INFO 2025-07-16 09:04:50 message";
        assert_eq!(LogRecord::parse(line), LogRecord::unframed(line));

        let line = "* INFO 2025-13-16T09:04:50,123 message";
        assert_eq!(LogRecord::parse(line), LogRecord::unframed(line));
    }

    #[test]
    fn empty_line() {
        assert_eq!(LogRecord::parse(""), LogRecord::unframed(""));
    }
}
