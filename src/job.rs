//! QAM job handles and states.
//!
//! ```text
//!   QUEUED ──→ RUNNING ──→ COMPLETED
//!     │           │
//!     │           ├──→ FAILED
//!     │           │
//!     └───────────┴──→ CANCELLED
//! ```
//!
//! A QVM job is `COMPLETED` as soon as it is submitted. QPU jobs move
//! through the gateway's queue. Readout can only be fetched from a
//! `COMPLETED` job.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle returned by [`Qam::submit`](crate::qam::Qam::submit).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where a job is in its lifecycle, in gateway terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    /// Execution failed; carries the gateway's error message.
    Failed(String),
    Cancelled,
}

impl JobStatus {
    /// Map a gateway status string (any case) and optional error message.
    ///
    /// Unknown statuses map to `Failed` so that polling terminates.
    pub fn from_gateway(status: &str, error: Option<String>) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "QUEUED" | "PENDING" => Self::Queued,
            "RUNNING" => Self::Running,
            "COMPLETED" | "DONE" => Self::Completed,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            "FAILED" => Self::Failed(error.unwrap_or_else(|| "unknown error".into())),
            other => Self::Failed(format!("unrecognized job status {other}")),
        }
    }

    /// `COMPLETED`, `FAILED` and `CANCELLED` never change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed(message) => return write!(f, "FAILED ({message})"),
        };
        f.write_str(label)
    }
}
