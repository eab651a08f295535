//! Canonical phrases for error status codes.
//!
//! One static table, consulted by the classifier when a failure carries no
//! message of its own and by the error log for its `Status Message` line.
//! Codes missing from the table resolve to [`UNKNOWN`].
//!
//! ```rust
//! use kiroku::status;
//!
//! assert_eq!(status::message(404), Some("Not Found"));
//! assert_eq!(status::message_or_unknown(599), "Unknown Error");
//! ```

/// Phrase for any status code the table does not list.
pub const UNKNOWN: &str = "Unknown Error";

/// Looks up the canonical phrase for `code`.
pub fn message(code: u16) -> Option<&'static str> {
    let phrase = match code {
        // ── 4xx Client errors ─────────────────────────────────────────────────
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a Teapot",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",

        // ── 5xx Server errors ─────────────────────────────────────────────────
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        507 => "Insufficient Storage",
        511 => "Network Authentication Required",

        _ => return None,
    };
    Some(phrase)
}

/// Like [`message`], but never fails.
pub fn message_or_unknown(code: u16) -> &'static str {
    message(code).unwrap_or(UNKNOWN)
}
