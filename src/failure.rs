//! Failure values produced by wrapped operations.
//!
//! Anything an operation can fail with lands in one of four shapes, from most
//! to least trusted:
//!
//! | Variant | What it carries |
//! |---|---|
//! | [`Failure::Http`] | a tagged [`HttpError`] with status, message and details |
//! | [`Failure::Status`] | a bare status code, maybe a message |
//! | [`Failure::Error`] | any other `std::error::Error` |
//! | [`Failure::Opaque`] | something that is not an error at all, e.g. a panic payload |
//!
//! `?` works on any error type inside a wrapped operation: the blanket
//! `From` impl recognises an [`HttpError`] behind the conversion and keeps its
//! tag, everything else becomes [`Failure::Error`].

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;

use serde_json::{Map, Value};

/// Ordered key/value payload attached to an [`HttpError`].
pub type Details = Map<String, Value>;

// ── HttpError ─────────────────────────────────────────────────────────────────

/// A domain error that knows which status it should produce.
///
/// ```rust
/// use kiroku::HttpError;
///
/// let err = HttpError::new(422, "email is invalid")
///     .with_detail("field", "email")
///     .with_detail("limits", serde_json::json!({ "max": 254 }));
///
/// assert_eq!(err.status(), 422);
/// assert_eq!(err.details().len(), 2);
/// ```
#[derive(Debug)]
pub struct HttpError {
    status: u16,
    message: String,
    details: Details,
    backtrace: Backtrace,
}

impl HttpError {
    /// Creates an error with `status` and `message`. A backtrace is captured
    /// when `RUST_BACKTRACE` allows it.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Details::new(),
            backtrace: Backtrace::capture(),
        }
    }

    /// `500 Internal Server Error` with a custom message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// Appends one detail entry. Insertion order is kept.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Appends every entry of `details`.
    pub fn with_details(mut self, details: Details) -> Self {
        self.details.extend(details);
        self
    }

    pub fn status(&self) -> u16 { self.status }
    pub fn message(&self) -> &str { &self.message }
    pub fn details(&self) -> &Details { &self.details }

    pub(crate) fn stack(&self) -> String {
        let mut stack = format!("HttpError: {}", self.message);
        if self.backtrace.status() == BacktraceStatus::Captured {
            stack.push('\n');
            stack.push_str(self.backtrace.to_string().trim_end());
        }
        stack
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl StdError for HttpError {}

// ── Failure ───────────────────────────────────────────────────────────────────

/// Everything a wrapped operation can fail with.
#[derive(Debug)]
pub enum Failure {
    Http(HttpError),
    Status { status: u16, message: Option<String> },
    Error(Box<dyn StdError + Send + Sync>),
    Opaque(String),
}

impl Failure {
    /// A bare status code without a message.
    pub fn status(status: u16) -> Self {
        Self::Status { status, message: None }
    }

    /// A bare status code with a message.
    pub fn status_with(status: u16, message: impl Into<String>) -> Self {
        Self::Status { status, message: Some(message.into()) }
    }

    /// A failure value that is not an error.
    pub fn opaque(value: impl Into<String>) -> Self {
        Self::Opaque(value.into())
    }

    /// Converts a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let text = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_owned(),
                Err(_) => "panic with a non-string payload".to_owned(),
            },
        };
        Self::Opaque(text)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => fmt::Display::fmt(err, f),
            Self::Status { status, message: Some(m) } => write!(f, "{status} {m}"),
            Self::Status { status, message: None } => write!(f, "{status}"),
            Self::Error(err) => fmt::Display::fmt(err, f),
            Self::Opaque(value) => f.write_str(value),
        }
    }
}

impl<E> From<E> for Failure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = Box::new(err);
        match boxed.downcast::<HttpError>() {
            Ok(http) => Self::Http(*http),
            Err(other) => Self::Error(other),
        }
    }
}

/// `"Error: <message>"` followed by one `caused by:` line per source.
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut stack = format!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        stack.push_str("\ncaused by: ");
        stack.push_str(&cause.to_string());
        source = cause.source();
    }
    stack
}
