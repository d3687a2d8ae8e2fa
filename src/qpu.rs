//! QPU client.
//!
//! Submits compiled programs to an execution gateway in front of a QCS
//! quantum processor and tracks them as jobs:
//!
//! | Method | Endpoint |
//! |--------|----------|
//! | availability | `GET /quantum-processors/{id}` |
//! | submit | `POST /jobs` |
//! | status | `GET /jobs/{job}` |
//! | result | `GET /jobs/{job}/results` |
//! | cancel | `DELETE /jobs/{job}` |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::QcsConfig;
use crate::error::{QcsError, QcsResult};
use crate::http::HttpClient;
use crate::job::{JobId, JobStatus};
use crate::program::Program;
use crate::qam::{Availability, Qam};
use crate::result::ExecutionData;

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    quantum_processor_id: &'a str,
    program: String,
    shots: u32,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessorStatusResponse {
    status: String,
    #[serde(default)]
    queue_depth: Option<u32>,
}

/// HTTP client for one quantum processor behind an execution gateway.
#[derive(Debug)]
pub struct QpuClient {
    quantum_processor_id: String,
    http: HttpClient,
}

impl QpuClient {
    /// Create a client for `quantum_processor_id`. Requires
    /// `config.qpu_gateway_url`.
    pub fn new(quantum_processor_id: impl Into<String>, config: &QcsConfig) -> QcsResult<Self> {
        let quantum_processor_id = quantum_processor_id.into();
        let gateway = config.qpu_gateway_url.as_deref().ok_or_else(|| {
            QcsError::Configuration(format!(
                "no QPU gateway configured for {quantum_processor_id}. Set QCS_QPU_GATEWAY_URL \
                 or qpu_gateway_url in the settings file"
            ))
        })?;
        Ok(Self {
            http: HttpClient::new(gateway, config)?,
            quantum_processor_id,
        })
    }
}

#[async_trait]
impl Qam for QpuClient {
    fn name(&self) -> &str {
        &self.quantum_processor_id
    }

    async fn availability(&self) -> QcsResult<Availability> {
        let path = format!("/quantum-processors/{}", self.quantum_processor_id);
        let response: ProcessorStatusResponse = self
            .http
            .get_json("get_quantum_processor_status", &path, &[])
            .await?;
        if response.status.eq_ignore_ascii_case("online") {
            Ok(Availability {
                is_available: true,
                queue_depth: response.queue_depth,
                status_message: None,
            })
        } else {
            Ok(Availability::unavailable(response.status))
        }
    }

    async fn submit(&self, program: &Program, shots: u32) -> QcsResult<JobId> {
        let request = SubmitRequest {
            quantum_processor_id: &self.quantum_processor_id,
            program: program.to_quil(),
            shots,
        };
        let response: SubmitResponse = self.http.post_json("submit_job", "/jobs", &request).await?;
        info!(
            job_id = %response.id,
            quantum_processor_id = %self.quantum_processor_id,
            shots,
            "QPU job submitted"
        );
        Ok(JobId::new(response.id))
    }

    async fn status(&self, job_id: &JobId) -> QcsResult<JobStatus> {
        let path = format!("/jobs/{job_id}");
        let response: JobStatusResponse = self.http.get_json("get_job_status", &path, &[]).await?;
        Ok(JobStatus::from_gateway(&response.status, response.error))
    }

    async fn result(&self, job_id: &JobId) -> QcsResult<ExecutionData> {
        let path = format!("/jobs/{job_id}/results");
        self.http.get_json("get_job_results", &path, &[]).await
    }

    async fn cancel(&self, job_id: &JobId) -> QcsResult<()> {
        let path = format!("/jobs/{job_id}");
        self.http.delete("cancel_job", &path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_gateway() {
        let err = QpuClient::new("Ankaa-3", &QcsConfig::default()).unwrap_err();
        assert!(matches!(err, QcsError::Configuration(_)));

        let config = QcsConfig {
            qpu_gateway_url: Some("https://gateway.example.com".into()),
            ..Default::default()
        };
        let client = QpuClient::new("Ankaa-3", &config).unwrap();
        assert_eq!(client.name(), "Ankaa-3");
    }

    #[test]
    fn test_results_payload_decodes() {
        let data: ExecutionData = serde_json::from_str(
            r#"{"readout": {"m0": [[0, 1], [1, 1]]}, "execution_time_ms": 12}"#,
        )
        .unwrap();
        assert_eq!(data.readout["m0"].len(), 2);
        assert_eq!(data.execution_time_ms, Some(12));
    }

    #[test]
    fn test_submit_request_json() {
        let request = SubmitRequest {
            quantum_processor_id: "Ankaa-3",
            program: "H 0\n".into(),
            shots: 100,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["quantum_processor_id"], "Ankaa-3");
        assert_eq!(json["shots"], 100);
    }
}
