//! Middleware layer.
//!
//! Two pieces sit around every wrapped operation:
//!
//! - [`Wrapped`] — times the operation, forwards its failures into the error
//!   chain and appends a success block for 2xx answers.
//! - [`ErrorResponder`] — the error-chain step that classifies a failure,
//!   appends an error block and writes the JSON error envelope.
//!
//! Both are obtained from a [`Recorder`](crate::Recorder).

mod error;
mod wrap;

pub use error::{ErrorBody, ErrorResponder};
pub use wrap::Wrapped;
