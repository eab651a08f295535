//! JSON error responder.
//!
//! The client always gets the same envelope:
//!
//! ```json
//! { "status": "error", "statusCode": 404, "message": "Not Found" }
//! ```
//!
//! In development mode `stack` is added, and `details` whenever the
//! classifier surfaced some. Outside development neither ever leaves the
//! process.

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::classify::{ClassifiedError, classify};
use crate::failure::{Details, Failure};
use crate::handler::{ErrorHandler, Next};
use crate::recorder::Recorder;
use crate::response::Response;

/// Body written by [`ErrorResponder`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody<'a> {
    pub status: &'static str,
    pub status_code: u16,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a Details>,
}

impl<'a> ErrorBody<'a> {
    pub fn new(classified: &'a ClassifiedError, development: bool) -> Self {
        Self {
            status: "error",
            status_code: classified.status_code,
            message: &classified.message,
            stack: classified.stack.as_deref().filter(|_| development),
            details: classified.details.as_ref(),
        }
    }
}

/// Error-chain step that classifies, logs and answers.
///
/// Obtain via [`Recorder::error_responder`](crate::Recorder::error_responder).
/// When the carrier was already written it forwards the failure to the next
/// step instead of overwriting the response. Only the responder that writes
/// the envelope appends an error block, so one failure is logged once.
#[derive(Debug, Clone)]
pub struct ErrorResponder {
    recorder: Recorder,
}

impl ErrorResponder {
    pub(crate) fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl ErrorHandler for ErrorResponder {
    fn handle(&self, failure: Failure, res: &mut Response, next: Next) {
        if res.is_sent() {
            debug!(%failure, "response already written, forwarding");
            return next.forward(failure, res);
        }

        let config = self.recorder.config();
        let classified = classify(&failure, config);

        if config.is_development() {
            error!(?failure, status = classified.status_code, "request failed");
        }

        let body = ErrorBody::new(&classified, config.is_development());
        match Response::json_value(classified.status_code, &body) {
            Ok(written) => {
                self.recorder.record_error(&classified);
                *res = written;
            }
            Err(e) => {
                warn!(error = %e, "could not encode error body");
                next.forward(failure, res);
            }
        }
    }
}
