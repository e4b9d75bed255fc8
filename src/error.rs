//! Typed error kinds. Recoverable errors (unknown-order pickup) never
//! surface here; they're handled locally and logged as warnings.

use thiserror::Error;

/// Failures at the storage engine's API. The only illegal input a caller
/// can produce is placing an order that's already resident.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("order {0} is already resident")]
    AlreadyResident(String),
}

/// Failures talking to the challenge server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication failed: token was rejected (HTTP 401)")]
    Authentication,
    #[error("test {0} was already submitted (HTTP 409); use --skip-submission to replay")]
    DoubleSubmission(String),
    #[error("challenge server returned HTTP {status}: {body_excerpt}")]
    Protocol { status: u16, body_excerpt: String },
}

/// Failures reading or writing a test-case file.
#[derive(Debug, Error)]
pub enum TestCaseError {
    #[error("failed to read test case from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write test case to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed test case in {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
