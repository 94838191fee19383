//! `--since` parser
//!
//! Log timestamps are local wall-clock times without a zone, so every
//! expression resolves to a local `NaiveDateTime`:
//! - "today", "yesterday" - start of the day
//! - "-30m", "-2hours", "-1d", "-1w" - relative to now
//! - "2025-07-16" - start of that day
//! - "2025-07-16 09:30:00", "2025-07-16T09:30:00,123" - exact time

use anyhow::{Result, anyhow};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S,%3f",
    "%Y-%m-%dT%H:%M",
];

/// Parses a `--since` expression.
pub fn parse_since(expr: &str) -> Result<NaiveDateTime> {
    let expr = expr.trim();
    let now = Local::now().naive_local();

    match expr.to_lowercase().as_str() {
        "today" => start_of_day(now.date()),
        "yesterday" => start_of_day(now.date() - Duration::days(1)),
        lower => {
            if let Some(duration) = parse_relative(lower)? {
                return now
                    .checked_sub_signed(duration)
                    .ok_or_else(|| anyhow!("Relative time out of range: {expr}"));
            }
            parse_absolute(expr)
        }
    }
}

fn start_of_day(date: NaiveDate) -> Result<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Failed to create start of day for {date}"))
}

fn parse_relative(expr: &str) -> Result<Option<Duration>> {
    let Some(expr) = expr.strip_prefix('-') else {
        return Ok(None);
    };

    let Some(pos) = expr.find(|c: char| !c.is_ascii_digit()) else {
        return Err(anyhow!("No time unit specified in relative time"));
    };

    let (number, unit) = expr.split_at(pos);
    let value: i64 = number
        .parse()
        .map_err(|_| anyhow!("Invalid number in relative time: {number}"))?;

    let duration = match unit {
        "m" | "min" | "minute" | "minutes" => Duration::try_minutes(value),
        "h" | "hour" | "hours" => Duration::try_hours(value),
        "d" | "day" | "days" => Duration::try_days(value),
        "w" | "week" | "weeks" => Duration::try_weeks(value),
        _ => return Err(anyhow!("Unknown time unit: {unit}")),
    };

    duration
        .map(Some)
        .ok_or_else(|| anyhow!("Relative time out of range: -{expr}"))
}

fn parse_absolute(expr: &str) -> Result<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(expr, format) {
            return Ok(datetime);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return start_of_day(date);
    }

    Err(anyhow!("Could not parse time specification: {expr}"))
}
