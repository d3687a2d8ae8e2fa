//! Quantum abstract machine trait and availability types.
//!
//! A [`Qam`] executes compiled Quil programs. The lifecycle mirrors a job
//! queue:
//!
//! ```text
//!   submit() ──→ status() ──→ result()
//!   (async)      (async)      (async)
//! ```
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `availability()` | async | yes | `QcsResult<Availability>` |
//! | `submit()` | async | yes | `QcsResult<JobId>` |
//! | `status()` | async | yes | `QcsResult<JobStatus>` |
//! | `result()` | async | yes | `QcsResult<ExecutionData>` |
//! | `cancel()` | async | yes | `QcsResult<()>` |
//! | `wait()` | async | provided | `QcsResult<ExecutionData>` |

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{QcsError, QcsResult};
use crate::job::{JobId, JobStatus};
use crate::program::Program;
use crate::result::ExecutionData;

/// Interval between status polls in [`Qam::wait`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Number of polls before [`Qam::wait`] gives up (5 minutes).
pub const MAX_POLLS: u32 = 600;

/// A machine that executes Quil programs: a QVM or a QPU.
#[async_trait]
pub trait Qam: Send + Sync {
    /// Name of the machine.
    fn name(&self) -> &str;

    /// Check whether the machine is accepting jobs.
    async fn availability(&self) -> QcsResult<Availability>;

    /// Submit `program` for `shots` repetitions. Any `MOVE` instructions for
    /// parameter memory are already part of the program.
    async fn submit(&self, program: &Program, shots: u32) -> QcsResult<JobId>;

    /// Get the status of a job.
    async fn status(&self, job_id: &JobId) -> QcsResult<JobStatus>;

    /// Get the readout of a completed job.
    async fn result(&self, job_id: &JobId) -> QcsResult<ExecutionData>;

    /// Cancel a pending job.
    async fn cancel(&self, job_id: &JobId) -> QcsResult<()>;

    /// Wait for a job to complete and return its readout.
    ///
    /// Polls every [`POLL_INTERVAL`] for at most [`MAX_POLLS`] polls.
    async fn wait(&self, job_id: &JobId) -> QcsResult<ExecutionData> {
        for _ in 0..MAX_POLLS {
            match self.status(job_id).await? {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(QcsError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(QcsError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }

        Err(QcsError::Timeout(job_id.0.clone()))
    }
}

/// Machine availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
    /// Whether the machine is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs currently in queue (if known).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<u32>,
    /// Human-readable status message, such as a version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl Availability {
    /// An idle machine.
    pub fn available(message: Option<String>) -> Self {
        Self {
            is_available: true,
            queue_depth: Some(0),
            status_message: message,
        }
    }

    /// An offline machine.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            status_message: Some(reason.into()),
        }
    }
}
