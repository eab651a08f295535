//! HTTP server and graceful shutdown.
//!
//! The server is a thin shell around one [`Handler`]: it reads each request
//! off the wire, hands it over together with the error chain, and writes back
//! whatever comes out. There is no routing here; put a router in front of or
//! inside the handler.
//!
//! On **SIGTERM** or Ctrl-C it stops accepting, lets in-flight connections
//! finish, then returns from [`Server::serve`].

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Error;
use crate::handler::{BoxedErrorHandler, BoxedHandler, ErrorHandler, Handler, Next};
use crate::request::Request;
use crate::response::Response;

/// Header read into [`Request::id`].
const REQUEST_ID_HEADER: &str = "x-request-id";

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    error_chain: Vec<BoxedErrorHandler>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use kiroku::Server;
    /// let server = Server::bind("0.0.0.0:3000")?;
    /// # Ok::<(), kiroku::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()?, error_chain: Vec::new() })
    }

    /// Appends a step to the error chain. Steps run in registration order.
    pub fn error_handler(mut self, step: impl ErrorHandler) -> Self {
        self.error_chain.push(Arc::new(step));
        self
    }

    /// Starts accepting connections and dispatching them to `handler`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, handler: impl Handler) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // One handler and one error chain serve every connection. Both are
        // behind an `Arc`, so a task only clones a pointer.
        let handler: BoxedHandler = Arc::new(handler);
        let next = Next::new(self.error_chain);

        info!(addr = %self.addr, "kiroku listening");

        // Every connection task is tracked here so shutdown can wait for the
        // requests still running, and for the log blocks they will append.
        let mut tasks = tokio::task::JoinSet::new();

        // Polled on every loop turn; `select!` needs it pinned to poll it by
        // reference.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Arms are polled in order, so a pending shutdown wins over
                // connections still queued on the listener.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let handler = Arc::clone(&handler);
                    let next = next.clone();
                    // Bridges tokio's socket to hyper's IO traits.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection. Each call
                        // gets its own `Next`, positioned at the chain start.
                        let svc = service_fn(move |req| {
                            let handler = Arc::clone(&handler);
                            let next = next.clone();
                            async move { dispatch(handler, next, req, remote_addr).await }
                        });

                        // HTTP/1.1 or HTTP/2, whichever the client speaks.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set stays small on a
                // long-running server.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: no new connections, in-flight ones run to completion.
        while tasks.join_next().await.is_some() {}

        info!("kiroku stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts one hyper request, runs the handler, converts the response back.
///
/// Every failure becomes a response, so hyper never sees an error.
async fn dispatch(
    handler: BoxedHandler,
    next: Next,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(peer = %remote_addr, "could not read request body: {e}");
            return Ok(Response::status(400).into_http());
        }
    };

    let response = handler.call(into_request(parts, body, remote_addr), next).await;
    Ok(response.into_http())
}

fn into_request(parts: http::request::Parts, body: Bytes, remote_addr: SocketAddr) -> Request {
    let url = parts.uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());

    let mut req = Request::new(parts.method.as_str(), url)
        .with_remote_addr(remote_addr)
        .with_body(body);
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            req = req.with_header(name.as_str(), value);
        }
    }
    if let Some(id) = req.header(REQUEST_ID_HEADER).map(str::to_owned) {
        req = req.with_id(id);
    }
    req
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. A signal that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
