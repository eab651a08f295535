//! Async operation wrapper.
//!
//! # Lifecycle of one call
//!
//! ```text
//! start ── capture Instant + request trace
//!   │
//!   ▼
//! running ── operation(req).await, panics caught
//!   │
//!   ├─ Ok(r)        → r.into_response()
//!   └─ Err / panic  → next.fail(failure)      (error chain writes the response)
//!   │
//!   ▼
//! finalize ── 2xx and logging on → success block
//! ```
//!
//! The elapsed time is taken the moment the operation settles, before the
//! error chain runs. Every exit path goes through the same `match`, so the
//! finalize step cannot be skipped; a failure in it is logged and dropped.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use futures::FutureExt;

use crate::failure::Failure;
use crate::handler::{BoxFuture, Handler, Next};
use crate::recorder::{Recorder, RequestTrace};
use crate::request::Request;
use crate::response::IntoResponse;

/// A fallible async operation adapted into a [`Handler`].
///
/// Built by [`Recorder::wrap`](crate::Recorder::wrap). The operation signature
/// is
///
/// ```text
/// async fn name(req: Request) -> Result<impl IntoResponse, Failure>
/// ```
pub struct Wrapped<F> {
    recorder: Recorder,
    operation: F,
}

impl<F> Wrapped<F> {
    pub(crate) fn new(recorder: Recorder, operation: F) -> Self {
        Self { recorder, operation }
    }
}

impl<F, Fut, R> Handler for Wrapped<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Failure>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let recorder = self.recorder.clone();
        let trace = RequestTrace::capture(&req);
        let started = Instant::now();

        // A closure may panic before it ever returns a future.
        let invoked = panic::catch_unwind(AssertUnwindSafe(|| (self.operation)(req)));

        Box::pin(async move {
            let settled = match invoked {
                Ok(fut) => AssertUnwindSafe(fut)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(Failure::from_panic(payload))),
                Err(payload) => Err(Failure::from_panic(payload)),
            };
            let elapsed = started.elapsed();

            let response = match settled {
                Ok(output) => output.into_response(),
                Err(failure) => next.fail(failure),
            };

            recorder.record_success(trace, response.status_code(), elapsed);
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::config::Config;
    use crate::failure::HttpError;
    use crate::log::Stream;
    use crate::response::Response;

    fn recorder(dir: &std::path::Path) -> Recorder {
        Recorder::new(Config::new().log_dir(dir))
    }

    #[tokio::test]
    async fn success_passes_response_through_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let r = recorder(dir.path());
        let handler = r.wrap(|_req: Request| async { Ok::<_, Failure>(Response::text("ok")) });

        let res = handler.call(Request::new("GET", "/ping").with_id("abc"), r.next()).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"ok");

        let text = fs::read_to_string(r.writer().path(Stream::Success)).unwrap();
        assert!(text.contains("Request ID  : abc\n"));
        assert!(text.contains("URL         : /ping\n"));
    }

    #[tokio::test]
    async fn failure_goes_through_next_and_skips_success_log() {
        let dir = tempfile::tempdir().unwrap();
        let r = recorder(dir.path());
        let handler = r.wrap(|_req: Request| async {
            Err::<Response, Failure>(HttpError::new(404, "Not Found").into())
        });

        let res = handler.call(Request::new("GET", "/missing"), r.next()).await;
        assert_eq!(res.status_code(), 404);
        assert!(!r.writer().path(Stream::Success).exists());
        assert!(r.writer().path(Stream::Error).exists());
    }

    #[tokio::test]
    async fn failure_reaches_custom_next() {
        let dir = tempfile::tempdir().unwrap();
        let r = recorder(dir.path());
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let step = move |failure: Failure, res: &mut Response, _next: Next| {
            flag.store(true, Ordering::SeqCst);
            assert!(matches!(failure, Failure::Status { status: 409, .. }));
            *res = Response::status(409);
        };
        let chain: Vec<crate::handler::BoxedErrorHandler> = vec![Arc::new(step)];

        let handler = r.wrap(|_req: Request| async { Err::<(), _>(Failure::status(409)) });
        let res = handler.call(Request::new("PUT", "/x"), Next::new(chain)).await;

        assert!(called.load(Ordering::SeqCst));
        assert_eq!(res.status_code(), 409);
    }

    #[tokio::test]
    async fn step_that_ignores_failure_does_not_count_as_success() {
        let dir = tempfile::tempdir().unwrap();
        let r = recorder(dir.path());
        let observe = |_failure: Failure, _res: &mut Response, _next: Next| {};
        let chain: Vec<crate::handler::BoxedErrorHandler> =
            vec![Arc::new(observe), Arc::new(r.error_responder())];

        let handler = r.wrap(|_req: Request| async { Err::<Response, _>(Failure::status(500)) });
        let res = handler.call(Request::new("GET", "/dropped"), Next::new(chain)).await;

        assert!(res.is_sent());
        assert_eq!(res.status_code(), 500);
        assert!(!res.body().is_empty());
        assert!(!r.writer().path(Stream::Success).exists());
    }

    #[tokio::test]
    async fn panics_are_forwarded_as_failures() {
        let dir = tempfile::tempdir().unwrap();
        let r = recorder(dir.path());
        let handler = r.wrap(|_req: Request| async {
            if true {
                panic!("operation exploded");
            }
            Ok::<_, Failure>("unreachable")
        });

        let res = handler.call(Request::new("GET", "/boom"), r.next()).await;
        assert_eq!(res.status_code(), 500);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn non_2xx_success_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let r = recorder(dir.path());
        let handler = r.wrap(|_req: Request| async { Ok::<_, Failure>(Response::status(304)) });

        let res = handler.call(Request::new("GET", "/cached"), r.next()).await;
        assert_eq!(res.status_code(), 304);
        assert!(!r.writer().path(Stream::Success).exists());
    }
}
