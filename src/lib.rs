//! # kiroku
//!
//! Request outcome capture for async HTTP handlers.
//!
//! Wrap an operation once and every request it serves ends up in one of two
//! places:
//!
//! - **answered** — the response goes back untouched and, for a 2xx, a
//!   success block is appended to `logs/success.log` with method, URL,
//!   status, duration and client IP;
//! - **failed** — the failure (an `Err`, or a panic) is forwarded to the error
//!   chain, classified, appended to `logs/errors.log`, and answered with a
//!   JSON envelope `{ status, statusCode, message }`.
//!
//! Stacks and error details are only shown to clients in development mode.
//! Logging problems never change what the client sees.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use kiroku::{Failure, HttpError, Recorder, Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kiroku::Error> {
//!     let recorder = Recorder::from_env();
//!
//!     Server::bind("0.0.0.0:3000")?
//!         .error_handler(recorder.error_responder())
//!         .serve(recorder.wrap(get_user))
//!         .await
//! }
//!
//! async fn get_user(req: Request) -> Result<Response, Failure> {
//!     let id = req.url().trim_start_matches("/users/");
//!     if id != "1" {
//!         return Err(HttpError::new(404, "Not Found").with_detail("id", id).into());
//!     }
//!     Ok(Response::json(br#"{"id":1,"name":"alice"}"#.to_vec()))
//! }
//! ```
//!
//! ## Environment
//!
//! [`Config::from_env`] reads `NODE_ENV` (`development` discloses stacks and
//! details) and `LOG` (`false` disables both log files). See [`config`].

mod classify;
mod error;
mod failure;
mod handler;
mod recorder;
mod request;
mod response;
mod server;

pub mod config;
pub mod log;
pub mod middleware;
pub mod status;
pub mod timestamp;

pub use classify::{ClassifiedError, classify};
pub use config::Config;
pub use error::Error;
pub use failure::{Details, Failure, HttpError};
pub use handler::{BoxFuture, BoxedErrorHandler, BoxedHandler, ErrorHandler, FnHandler, Handler, Next, handler_fn};
pub use log::{LogWriter, Stream};
pub use middleware::{ErrorResponder, Wrapped};
pub use recorder::Recorder;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::Server;
