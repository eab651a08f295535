//! Turns any [`Failure`] into one canonical shape.

use crate::config::Config;
use crate::failure::{Details, Failure, error_chain};
use crate::status;

const DEFAULT_STATUS: u16 = 500;

/// The canonical form of a failure.
///
/// `status_code` is always within `100..=599` and `message` is never empty.
/// `stack` is filled whenever the failure has one; whether it reaches the
/// client is the responder's call. `details` is only filled in development.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedError {
    pub status_code: u16,
    pub message: String,
    pub details: Option<Details>,
    pub stack: Option<String>,
}

/// Derives status, message, details and stack from `failure`.
///
/// ```rust
/// use kiroku::{classify, Config, Failure};
///
/// let classified = classify(&Failure::status(404), &Config::new());
/// assert_eq!(classified.status_code, 404);
/// assert_eq!(classified.message, "Not Found");
/// ```
pub fn classify(failure: &Failure, config: &Config) -> ClassifiedError {
    match failure {
        Failure::Http(err) => {
            let status_code = normalize(err.status());
            let details = (config.is_development() && !err.details().is_empty())
                .then(|| err.details().clone());
            ClassifiedError {
                status_code,
                message: resolve_message(Some(err.message()), status_code),
                details,
                stack: Some(err.stack()),
            }
        }
        Failure::Status { status, message } => {
            let status_code = normalize(*status);
            ClassifiedError {
                status_code,
                message: resolve_message(message.as_deref(), status_code),
                details: None,
                stack: None,
            }
        }
        Failure::Error(err) => ClassifiedError {
            status_code: DEFAULT_STATUS,
            message: resolve_message(Some(&err.to_string()), DEFAULT_STATUS),
            details: None,
            stack: Some(error_chain(&**err)),
        },
        Failure::Opaque(_) => ClassifiedError {
            status_code: DEFAULT_STATUS,
            message: resolve_message(None, DEFAULT_STATUS),
            details: None,
            stack: None,
        },
    }
}

fn normalize(status: u16) -> u16 {
    if (100..=599).contains(&status) { status } else { DEFAULT_STATUS }
}

fn resolve_message(own: Option<&str>, status_code: u16) -> String {
    match own.filter(|m| !m.trim().is_empty()) {
        Some(message) => message.to_owned(),
        None => status::message_or_unknown(status_code).to_owned(),
    }
}
