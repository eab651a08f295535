//! Append-only request logs.
//!
//! Two files live under the configured directory (default `./logs`):
//!
//! | Stream | File | One block per |
//! |---|---|---|
//! | [`Stream::Success`] | `success.log` | request answered with a 2xx |
//! | [`Stream::Error`] | `errors.log` | failure that reached the error responder |
//!
//! Blocks are plain text meant for humans: a rule line, `Key : value` lines in
//! a fixed order, a closing rule and a blank line. The first block written to
//! a file is preceded by a short banner.
//!
//! A file is published with its banner already inside: the banner is written
//! to a temporary file in the same directory, which is then moved into place
//! only if no file of that name exists yet. Every [`LogWriter::append`] call
//! renders its block into one buffer and hands it to a single `write_all` on
//! an append-mode handle. Concurrent writers never lock; complete blocks may
//! land in any order, always after the banner.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::classify::ClassifiedError;
use crate::config::Config;
use crate::error::Error;
use crate::failure::Details;
use crate::status;
use crate::timestamp;

const RULE: &str = "===========================================================";
const DIVIDER: &str = "-----------------------------------------------------------";

const NO_CLIENT_IP: &str = "Not available";
const NO_DETAILS: &str = "No additional details available";
const NO_STACK: &str = "No stack trace available";

/// Detail keys that already have their own line in an error block.
const RESERVED_DETAIL_KEYS: [&str; 2] = ["statusCode", "stack"];

// ── Stream ────────────────────────────────────────────────────────────────────

/// The two logical log destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Success,
    Error,
}

impl Stream {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Success => "success.log",
            Self::Error => "errors.log",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One successfully answered request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    /// Milliseconds from operation start to completion.
    pub duration_ms: f64,
    pub client_ip: Option<String>,
}

/// One failure, as the error responder saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub message: String,
    pub status_code: u16,
    pub stack: Option<String>,
    pub details: Option<Details>,
}

impl From<&ClassifiedError> for ErrorRecord {
    fn from(classified: &ClassifiedError) -> Self {
        Self {
            message: classified.message.clone(),
            status_code: classified.status_code,
            stack: classified.stack.clone(),
            details: classified.details.clone(),
        }
    }
}

/// Something [`LogWriter::append`] can persist.
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Success(&'a RequestOutcome),
    Error(&'a ErrorRecord),
}

impl Record<'_> {
    pub fn stream(&self) -> Stream {
        match self {
            Self::Success(_) => Stream::Success,
            Self::Error(_) => Stream::Error,
        }
    }

    /// The block for this record, without banner.
    pub fn render(&self, timestamp: &str) -> String {
        match self {
            Self::Success(outcome) => render_success(outcome, timestamp),
            Self::Error(record) => render_error(record, timestamp),
        }
    }
}

// ── LogWriter ─────────────────────────────────────────────────────────────────

/// Appends rendered records to the files under one directory.
#[derive(Debug, Clone)]
pub struct LogWriter {
    dir: PathBuf,
    offset_minutes: i32,
}

impl LogWriter {
    pub fn new(dir: impl Into<PathBuf>, offset_minutes: i32) -> Self {
        Self { dir: dir.into(), offset_minutes }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.log_path(), config.offset_minutes())
    }

    pub fn dir(&self) -> &Path { &self.dir }

    /// Path of the file backing `stream`.
    pub fn path(&self, stream: Stream) -> PathBuf {
        self.dir.join(stream.file_name())
    }

    /// Appends `record`, stamped with the current time.
    pub fn append(&self, record: Record<'_>) -> Result<(), Error> {
        self.append_at(record, Utc::now())
    }

    /// Appends `record`, stamped with `now`.
    pub fn append_at(&self, record: Record<'_>, now: DateTime<Utc>) -> Result<(), Error> {
        let stream = record.stream();
        let stamp = timestamp::format(now, self.offset_minutes);

        fs::create_dir_all(&self.dir)?;
        let path = self.path(stream);
        if !path.exists() {
            self.install_banner(stream, &stamp, &path)?;
        }

        let mut file = OpenOptions::new().append(true).open(&path)?;
        file.write_all(record.render(&stamp).as_bytes())?;
        Ok(())
    }

    /// Publishes `path` holding only the banner, unless another writer has
    /// already published it.
    fn install_banner(&self, stream: Stream, stamp: &str, path: &Path) -> Result<(), Error> {
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(self.banner(stream, stamp).as_bytes())?;
        match staged.persist_noclobber(path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.error.into()),
        }
    }

    fn banner(&self, stream: Stream, stamp: &str) -> String {
        format!(
            "kiroku {} log, started {stamp} ({})\n\
             Each block below records one request.\n\n",
            stream.label(),
            timestamp::offset_label(self.offset_minutes),
        )
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn render_success(outcome: &RequestOutcome, timestamp: &str) -> String {
    format!(
        "{RULE}\n\
         Timestamp   : {timestamp}\n\
         Request ID  : {id}\n\
         Method      : {method}\n\
         URL         : {url}\n\
         Status Code : {status}\n\
         Duration    : {duration:.2} ms\n\
         Client IP   : {ip}\n\
         {DIVIDER}\n\
         {RULE}\n\n",
        id = outcome.request_id,
        method = outcome.method,
        url = outcome.url,
        status = outcome.status_code,
        duration = outcome.duration_ms,
        ip = outcome.client_ip.as_deref().unwrap_or(NO_CLIENT_IP),
    )
}

fn render_error(record: &ErrorRecord, timestamp: &str) -> String {
    format!(
        "{RULE}\n\
         Timestamp   : {timestamp}\n\
         Message     : {message}\n\
         {DIVIDER}\n\
         Status Code : {status}\n\
         Status Message : {phrase}\n\
         Details:\n\
         {details}\n\
         {DIVIDER}\n\
         Stack Trace:\n\
         {stack}\n\
         {RULE}\n\n",
        message = record.message,
        status = record.status_code,
        phrase = status::message_or_unknown(record.status_code),
        details = render_details(record.details.as_ref()),
        stack = render_stack(record.stack.as_deref()),
    )
}

fn render_details(details: Option<&Details>) -> String {
    let lines: Vec<String> = details
        .into_iter()
        .flatten()
        .filter(|(key, _)| !RESERVED_DETAIL_KEYS.contains(&key.as_str()))
        .map(|(key, value)| format!("  {key}: {}", render_value(value)))
        .collect();

    if lines.is_empty() { NO_DETAILS.to_owned() } else { lines.join("\n") }
}

/// Strings verbatim, other scalars as JSON, objects and arrays pretty-printed.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        scalar => scalar.to_string(),
    }
}

fn render_stack(stack: Option<&str>) -> String {
    match stack {
        Some(stack) if !stack.is_empty() => stack
            .lines()
            .map(|line| format!("    {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => NO_STACK.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn outcome() -> RequestOutcome {
        RequestOutcome {
            request_id: "req-1".into(),
            method: "GET".into(),
            url: "/users/42?full=1".into(),
            status_code: 200,
            duration_ms: 3.14159,
            client_ip: Some("10.0.0.7".into()),
        }
    }

    #[test]
    fn success_block_layout() {
        let block = Record::Success(&outcome()).render("01-02-2024 10:00:00");
        let expected = format!(
            "{RULE}\n\
             Timestamp   : 01-02-2024 10:00:00\n\
             Request ID  : req-1\n\
             Method      : GET\n\
             URL         : /users/42?full=1\n\
             Status Code : 200\n\
             Duration    : 3.14 ms\n\
             Client IP   : 10.0.0.7\n\
             {DIVIDER}\n\
             {RULE}\n\n"
        );
        assert_eq!(block, expected);
    }

    #[test]
    fn missing_client_ip_uses_fallback() {
        let mut o = outcome();
        o.client_ip = None;
        let block = Record::Success(&o).render("ts");
        assert!(block.contains("Client IP   : Not available\n"));
    }

    #[test]
    fn error_block_skips_reserved_keys_and_pretty_prints_objects() {
        let mut details = Details::new();
        details.insert("statusCode".into(), json!(404));
        details.insert("field".into(), json!("email"));
        details.insert("stack".into(), json!("ignored"));
        details.insert("limits".into(), json!({ "max": 3 }));
        details.insert("retry".into(), json!(false));

        let record = ErrorRecord {
            message: "invalid".into(),
            status_code: 422,
            stack: Some("HttpError: invalid\n   at frame".into()),
            details: Some(details),
        };
        let block = Record::Error(&record).render("ts");

        assert!(block.contains("Status Code : 422\nStatus Message : Unprocessable Entity\n"));
        assert!(block.contains(
            "Details:\n  field: email\n  limits: {\n  \"max\": 3\n}\n  retry: false\n"
        ));
        assert!(!block.contains("ignored"));
        assert!(block.contains("Stack Trace:\n    HttpError: invalid\n       at frame\n"));
        assert!(block.ends_with(&format!("{RULE}\n\n")));
    }

    #[test]
    fn error_block_fallbacks() {
        let record = ErrorRecord {
            message: "down".into(),
            status_code: 503,
            stack: None,
            details: None,
        };
        let block = Record::Error(&record).render("ts");
        assert!(block.contains("Status Message : Unknown Error\n"));
        assert!(block.contains("Details:\nNo additional details available\n"));
        assert!(block.contains("Stack Trace:\nNo stack trace available\n"));
    }

    #[test]
    fn details_with_only_reserved_keys_use_fallback() {
        let mut details = Details::new();
        details.insert("statusCode".into(), json!(500));
        let record = ErrorRecord {
            message: "x".into(),
            status_code: 500,
            stack: None,
            details: Some(details),
        };
        assert!(Record::Error(&record).render("ts").contains(NO_DETAILS));
    }

    #[test]
    fn banner_only_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::new(dir.path().join("nested/logs"), 0);
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        writer.append_at(Record::Success(&outcome()), now).unwrap();
        writer.append_at(Record::Success(&outcome()), now).unwrap();

        let text = fs::read_to_string(writer.path(Stream::Success)).unwrap();
        assert!(text.starts_with("kiroku success log, started 06-05-2024 07:08:09 (UTC+00:00)\n"));
        assert_eq!(text.matches("kiroku success log").count(), 1);
        assert_eq!(text.matches("Request ID  : req-1").count(), 2);
    }

    #[test]
    fn racing_first_writers_never_precede_the_banner() {
        for _ in 0..20 {
            let dir = tempfile::tempdir().unwrap();
            let writer = std::sync::Arc::new(LogWriter::new(dir.path(), 0));

            let threads: Vec<_> = (0..8)
                .map(|_| {
                    let writer = std::sync::Arc::clone(&writer);
                    std::thread::spawn(move || writer.append(Record::Success(&outcome())).unwrap())
                })
                .collect();
            for thread in threads {
                thread.join().unwrap();
            }

            let text = fs::read_to_string(writer.path(Stream::Success)).unwrap();
            assert!(text.starts_with("kiroku success log, started "));
            assert_eq!(text.matches("kiroku success log").count(), 1);
            assert_eq!(text.matches("Request ID  : req-1").count(), 8);
            assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1, "staged file left behind");
        }
    }

    #[test]
    fn streams_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::new(dir.path(), 330);
        let record = ErrorRecord {
            message: "boom".into(),
            status_code: 500,
            stack: None,
            details: None,
        };
        writer.append(Record::Error(&record)).unwrap();

        assert!(writer.path(Stream::Error).ends_with("errors.log"));
        assert!(writer.path(Stream::Error).exists());
        assert!(!writer.path(Stream::Success).exists());
    }
}
