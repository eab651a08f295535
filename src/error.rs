//! Unified error type.

/// The error type returned by kiroku's fallible operations.
///
/// Request failures travel as [`Failure`](crate::Failure) values and end up
/// as JSON responses. This type surfaces infrastructure problems: a log file
/// that cannot be appended to, a port that cannot be bound, a response body
/// that cannot be encoded.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}
