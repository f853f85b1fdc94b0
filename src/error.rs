// Error type for APIserver calls. Command handlers wrap these in anyhow
// context before they reach the user.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by `ApiClient` calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, TLS, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-200 HTTP status.
    #[error("HTTP {status} - {body}")]
    Status { status: StatusCode, body: String },

    /// HTTP was fine but the envelope carried an unexpected `code`.
    #[error("{msg} (code {code})")]
    Application { code: i64, msg: String },

    /// The body was not the JSON envelope we expected.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid CA certificate: {0}")]
    InvalidCertificate(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
