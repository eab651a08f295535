//! Handler contracts and the error chain.
//!
//! # Two kinds of handlers
//!
//! A [`Handler`] answers a request. It receives the [`Request`] and a
//! [`Next`] — the continuation into the error chain — and resolves to a
//! [`Response`]:
//!
//! ```text
//! Handler::call(req, next) ──ok──────────────────────────────▶ Response
//!                          └─fail─▶ next.fail(failure)
//!                                     │
//!                                     ▼
//!                           ErrorHandler #1 ─forward─▶ #2 ─▶ … ─▶ terminal
//!                                     │
//!                                     ▼ writes into the carrier
//!                                  Response
//! ```
//!
//! An [`ErrorHandler`] is a synchronous step in that chain. It either writes
//! the carrier or forwards the failure to the step after it. The chain always
//! ends in a built-in terminal step: if nothing wrote the carrier, it becomes
//! a plain-text `500`.
//!
//! # Storage
//!
//! Handlers are stored as trait objects behind an `Arc` so one instance serves
//! every concurrent request. The per-request cost is one `Arc` clone and one
//! virtual call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{error, warn};

use crate::failure::Failure;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` lets tokio move it across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

// ── Handler ───────────────────────────────────────────────────────────────────

/// Answers one request.
///
/// Implemented by [`Wrapped`](crate::middleware::Wrapped) and by
/// [`handler_fn`] adapters. Implement it directly for anything else.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        (**self).call(req, next)
    }
}

/// Adapts an infallible `async fn(Request) -> impl IntoResponse`.
///
/// The adapter ignores `next`: such a function has no failure to forward.
///
/// ```rust
/// use kiroku::{handler_fn, Request};
///
/// async fn hello(_req: Request) -> &'static str { "hello" }
///
/// let handler = handler_fn(hello);
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FnHandler(f)
}

/// Newtype returned by [`handler_fn`].
pub struct FnHandler<F>(F);

impl<F, Fut, R> Handler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, _next: Next) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── ErrorHandler ──────────────────────────────────────────────────────────────

/// One step of the error chain.
///
/// Closures with the matching signature implement it:
///
/// ```rust
/// use std::sync::Arc;
///
/// use kiroku::{BoxedErrorHandler, Failure, Next, Response};
///
/// let teapot = |failure: Failure, res: &mut Response, next: Next| {
///     if failure.to_string().contains("tea") {
///         *res = Response::builder().status(418).text("short and stout");
///     } else {
///         next.forward(failure, res);
///     }
/// };
/// let chain: Vec<BoxedErrorHandler> = vec![Arc::new(teapot)];
/// let next = Next::new(chain);
/// ```
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, failure: Failure, res: &mut Response, next: Next);
}

impl<F> ErrorHandler for F
where
    F: Fn(Failure, &mut Response, Next) + Send + Sync + 'static,
{
    fn handle(&self, failure: Failure, res: &mut Response, next: Next) {
        (self)(failure, res, next)
    }
}

/// A type-erased error chain step.
pub type BoxedErrorHandler = Arc<dyn ErrorHandler>;

// ── Next ──────────────────────────────────────────────────────────────────────

/// Continuation into the error chain.
///
/// Cloning is cheap: the chain itself is shared.
#[derive(Clone)]
pub struct Next {
    chain: Arc<[BoxedErrorHandler]>,
    position: usize,
}

impl Next {
    pub fn new(chain: Vec<BoxedErrorHandler>) -> Self {
        Self { chain: chain.into(), position: 0 }
    }

    /// A chain made of the terminal step only.
    pub fn terminal() -> Self {
        Self::new(Vec::new())
    }

    /// Runs the chain from here on a fresh carrier and returns it.
    ///
    /// A step that returns without writing or forwarding still leaves the
    /// carrier unsent; it is then answered with the terminal `500`.
    pub fn fail(self, failure: Failure) -> Response {
        let mut res = Response::pending();
        self.forward(failure, &mut res);
        if !res.is_sent() {
            error!("error chain returned without writing a response");
            res = internal_error();
        }
        res
    }

    /// Hands `failure` to the next step of the chain.
    pub fn forward(self, failure: Failure, res: &mut Response) {
        match self.chain.get(self.position).cloned() {
            Some(step) => {
                let rest = Self { chain: self.chain, position: self.position + 1 };
                step.handle(failure, res, rest);
            }
            None => finish(failure, res),
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("steps", &self.chain.len())
            .field("position", &self.position)
            .finish()
    }
}

/// The terminal step.
fn finish(failure: Failure, res: &mut Response) {
    if res.is_sent() {
        warn!(%failure, "failure reached the end of the error chain after a response was written");
        return;
    }
    error!(%failure, "unhandled failure");
    *res = internal_error();
}

fn internal_error() -> Response {
    Response::builder().status(500).text("Internal Server Error")
}
