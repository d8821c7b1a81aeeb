//! CSV export of the probe log.
//!
//! Rows are written oldest first. Local timestamps use a locale-style
//! `M/D/YYYY, h:mm:ss AM` string and are quoted; UTC timestamps use RFC 3339
//! with millisecond precision and are left bare.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};

use crate::monitor::{LogEntry, TimeMode};

/// Content type for exported files.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Rendered CSV document and its download name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// Suggested file name, `ping-logs-<YYYY-MM-DD>.csv`.
    pub filename: String,
    /// CSV body.
    pub content: String,
}

impl CsvExport {
    /// Wrap rendered CSV with a file name for `date`.
    pub fn new(content: String, date: NaiveDate) -> Self {
        Self {
            filename: export_filename(date),
            content,
        }
    }

    /// `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Download file name for a given date.
pub fn export_filename(date: NaiveDate) -> String {
    format!("ping-logs-{}.csv", date.format("%Y-%m-%d"))
}

/// Render entries as CSV in the order given.
///
/// Callers pass entries oldest first.
pub fn render_csv<'a, I>(entries: I, mode: TimeMode) -> String
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut rows = vec![format!(
        "Timestamp ({}),Server,Response Time (ms),Status",
        mode.label()
    )];

    for entry in entries {
        let timestamp = match mode {
            TimeMode::Local => format!("\"{}\"", format_timestamp(&entry.timestamp, mode)),
            TimeMode::Utc => format_timestamp(&entry.timestamp, mode),
        };
        let latency = entry
            .latency_ms
            .map(|ms| ms.to_string())
            .unwrap_or_default();

        rows.push(format!(
            "{},{},{},{}",
            timestamp,
            quote(&entry.target),
            latency,
            entry.status
        ));
    }

    rows.join("\n")
}

/// Full date-time string for a timestamp in the given mode.
pub fn format_timestamp(ts: &DateTime<Utc>, mode: TimeMode) -> String {
    match mode {
        TimeMode::Local => ts
            .with_timezone(&Local)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string(),
        TimeMode::Utc => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Quote a field, doubling embedded quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
