//! Shared state behind the wrapper and the error responder.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::classify::ClassifiedError;
use crate::config::Config;
use crate::failure::Failure;
use crate::handler::{BoxedErrorHandler, Next};
use crate::log::{ErrorRecord, LogWriter, Record, RequestOutcome};
use crate::middleware::{ErrorResponder, Wrapped};
use crate::request::Request;
use crate::response::IntoResponse;

/// Logged in place of a missing request id.
const NO_REQUEST_ID: &str = "N/A";

/// One [`Config`] plus the [`LogWriter`] built from it.
///
/// Cloning is cheap; every clone shares the same state.
///
/// ```rust,no_run
/// use kiroku::{Config, HttpError, Failure, Recorder, Request, Response};
///
/// async fn get_user(req: Request) -> Result<Response, Failure> {
///     match req.url() {
///         "/users/1" => Ok(Response::json(br#"{"id":1}"#.to_vec())),
///         _ => Err(HttpError::new(404, "Not Found").into()),
///     }
/// }
///
/// let recorder = Recorder::new(Config::from_env());
/// let handler = recorder.wrap(get_user);
/// let next = recorder.next();
/// ```
#[derive(Debug, Clone)]
pub struct Recorder {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: Config,
    writer: LogWriter,
}

impl Recorder {
    pub fn new(config: Config) -> Self {
        let writer = LogWriter::from_config(&config);
        Self { inner: Arc::new(Inner { config, writer }) }
    }

    /// Shorthand for `Recorder::new(Config::from_env())`.
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    pub fn config(&self) -> &Config { &self.inner.config }
    pub fn writer(&self) -> &LogWriter { &self.inner.writer }

    /// Wraps `operation` into a [`Handler`](crate::Handler) that times it and
    /// forwards its failures. See [`Wrapped`].
    pub fn wrap<F, Fut, R>(&self, operation: F) -> Wrapped<F>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Failure>> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        Wrapped::new(self.clone(), operation)
    }

    /// The JSON error responder bound to this recorder.
    pub fn error_responder(&self) -> ErrorResponder {
        ErrorResponder::new(self.clone())
    }

    /// An error chain made of [`error_responder`](Recorder::error_responder)
    /// followed by the terminal step.
    pub fn next(&self) -> Next {
        let chain: Vec<BoxedErrorHandler> = vec![Arc::new(self.error_responder())];
        Next::new(chain)
    }

    /// Appends a success block when `status` is 2xx and logging is on.
    /// Append failures are reported through `tracing` and swallowed.
    pub(crate) fn record_success(&self, trace: RequestTrace, status: u16, elapsed: Duration) {
        if !(200..300).contains(&status) || !self.config().is_log_enabled() {
            return;
        }
        let outcome = RequestOutcome {
            request_id: trace.id.unwrap_or_else(|| NO_REQUEST_ID.to_owned()),
            method: trace.method,
            url: trace.url,
            status_code: status,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            client_ip: trace.client_ip,
        };
        debug!(
            request_id = %outcome.request_id,
            method = %outcome.method,
            url = %outcome.url,
            status,
            duration_ms = outcome.duration_ms,
            "request succeeded"
        );
        if let Err(e) = self.writer().append(Record::Success(&outcome)) {
            warn!(error = %e, path = %self.writer().dir().display(), "could not append success record");
        }
    }

    /// Appends an error block when logging is on. Same failure policy as
    /// [`record_success`](Recorder::record_success).
    pub(crate) fn record_error(&self, classified: &ClassifiedError) {
        if !self.config().is_log_enabled() {
            return;
        }
        let record = ErrorRecord::from(classified);
        if let Err(e) = self.writer().append(Record::Error(&record)) {
            warn!(error = %e, path = %self.writer().dir().display(), "could not append error record");
        }
    }
}

/// The request fields a success block needs, taken before the request is
/// handed to the operation.
#[derive(Debug, Clone)]
pub(crate) struct RequestTrace {
    pub(crate) id: Option<String>,
    pub(crate) method: String,
    pub(crate) url: String,
    pub(crate) client_ip: Option<String>,
}

impl RequestTrace {
    pub(crate) fn capture(req: &Request) -> Self {
        Self {
            id: req.id().map(str::to_owned),
            method: req.method().to_owned(),
            url: req.url().to_owned(),
            client_ip: req.client_ip(),
        }
    }
}
