//! Error types.
//!
//! Failures are grouped by what a caller can do about them:
//!
//! | Category | Variants | Recovery |
//! |----------|----------|----------|
//! | **Transient** | `Unavailable`, `Timeout`, `Api` (429/502/503/504) | Retry with backoff |
//! | **Permanent** | `InvalidCircuit`, `InvalidShots`, `UnresolvedParameter`, `InvalidProgram`, `Unsupported`, `InvalidName` | Fix input |
//! | **Job-level** | `JobFailed`, `JobCancelled`, `JobNotFound`, `UnexpectedResultCount` | Resubmit or abort |
//! | **Auth** | `AuthenticationFailed` | Re-authenticate |
//! | **Config** | `Configuration`, `Http` | Fix configuration |

use thiserror::Error;

/// Errors that can occur while resolving, compiling, running or describing
/// quantum computers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QcsError {
    // ── Transient errors (retry with backoff) ────────────────────────
    /// Service is not reachable.
    #[error("Service not available: {0}")]
    Unavailable(String),

    /// Timeout waiting for a job.
    #[error("Timed out waiting for job {0}")]
    Timeout(String),

    /// Non-success HTTP status from a remote service.
    #[error("{operation} failed ({status}): {message}")]
    Api {
        /// Operation that was attempted.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Response body or message.
        message: String,
    },

    // ── Permanent errors (fix input) ─────────────────────────────────
    /// Circuit cannot run on the target.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Invalid number of repetitions.
    #[error("Invalid shots: {0}")]
    InvalidShots(String),

    /// A symbolic parameter had no value in the resolver.
    #[error("Unresolved parameter: {0}")]
    UnresolvedParameter(String),

    /// Malformed Quil program or memory map.
    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    /// Unsupported feature or combination of options.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Quantum computer name cannot be resolved.
    #[error("Invalid quantum computer name: {0}")]
    InvalidName(String),

    // ── Job-level errors ─────────────────────────────────────────────
    /// Execution failed or returned unusable readout.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Cancelled before completion.
    #[error("Job cancelled")]
    JobCancelled,

    /// The QAM has no record of the job.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Executor returned a different number of results than requested.
    #[error("Expected {expected} result(s) from executor, got {actual}")]
    UnexpectedResultCount {
        /// Number of resolvers submitted.
        expected: usize,
        /// Number of results returned.
        actual: usize,
    },

    // ── Auth errors ──────────────────────────────────────────────────
    /// The access token was rejected (401/403).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // ── Config errors ────────────────────────────────────────────────
    /// Missing or invalid settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP transport or decoding error.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl QcsError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }
}

impl From<serde_yaml::Error> for QcsError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Configuration(format!("invalid settings file: {e}"))
    }
}

impl From<std::io::Error> for QcsError {
    fn from(e: std::io::Error) -> Self {
        Self::Configuration(format!("cannot read settings file: {e}"))
    }
}

/// Result type for this crate.
pub type QcsResult<T> = Result<T, QcsError>;
