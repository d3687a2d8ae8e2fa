//! QVM client.
//!
//! Talks to a running QVM over its HTTP JSON API. The QVM runs a program to
//! completion within the request, so a job is `Completed` as soon as
//! [`Qam::submit`] returns; results are held until retrieved once.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::capability::NoiseProfile;
use crate::config::QcsConfig;
use crate::error::{QcsError, QcsResult};
use crate::http::HttpClient;
use crate::job::{JobId, JobStatus};
use crate::program::Program;
use crate::qam::{Availability, Qam};
use crate::result::ExecutionData;

#[derive(Debug, Serialize)]
struct MultishotRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    addresses: FxHashMap<&'a str, bool>,
    trials: u32,
    #[serde(rename = "compiled-quil")]
    compiled_quil: String,
    #[serde(rename = "measurement-noise", skip_serializing_if = "Option::is_none")]
    measurement_noise: Option<[f64; 3]>,
    #[serde(rename = "rng-seed", skip_serializing_if = "Option::is_none")]
    rng_seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct VersionRequest {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// HTTP client for a QVM server.
#[derive(Debug)]
pub struct QvmClient {
    name: String,
    http: HttpClient,
    measurement_noise: Option<[f64; 3]>,
    rng_seed: Option<u64>,
    results: Mutex<FxHashMap<JobId, ExecutionData>>,
    next_id: AtomicU64,
}

impl QvmClient {
    /// Create a client for the QVM at `config.qvm_url`.
    pub fn new(name: impl Into<String>, config: &QcsConfig) -> QcsResult<Self> {
        Ok(Self {
            name: name.into(),
            http: HttpClient::new(&config.qvm_url, config)?,
            measurement_noise: None,
            rng_seed: config.qvm_random_seed,
            results: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(0),
        })
    }

    /// Apply the readout part of `profile` as pre-measurement bit-flip noise.
    pub fn with_noise(mut self, profile: &NoiseProfile) -> Self {
        self.measurement_noise = measurement_noise(profile);
        self
    }

    pub fn measurement_noise(&self) -> Option<[f64; 3]> {
        self.measurement_noise
    }
}

fn measurement_noise(profile: &NoiseProfile) -> Option<[f64; 3]> {
    profile
        .readout_fidelity
        .map(|fidelity| [(1.0 - fidelity).clamp(0.0, 1.0), 0.0, 0.0])
}

#[async_trait]
impl Qam for QvmClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn availability(&self) -> QcsResult<Availability> {
        let request = VersionRequest { kind: "version" };
        match self.http.post_text("qvm_version", "", &request).await {
            Ok(version) => Ok(Availability::available(Some(version.trim().to_string()))),
            Err(e) if e.is_transient() => Ok(Availability::unavailable(e.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn submit(&self, program: &Program, shots: u32) -> QcsResult<JobId> {
        let regions = program.readout_regions();
        let request = MultishotRequest {
            kind: "multishot",
            addresses: regions.iter().map(|&r| (r, true)).collect(),
            trials: shots,
            compiled_quil: program.to_quil(),
            measurement_noise: self.measurement_noise,
            rng_seed: self.rng_seed,
        };

        debug!(qvm = %self.name, shots, regions = regions.len(), "running program on QVM");
        let readout: FxHashMap<String, Vec<Vec<i64>>> =
            self.http.post_json("qvm_multishot", "", &request).await?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let job_id = JobId::new(format!("{}-{id}", self.name));
        self.results
            .lock()
            .await
            .insert(job_id.clone(), ExecutionData::new(readout));
        info!(job_id = %job_id, "QVM job completed");
        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> QcsResult<JobStatus> {
        if self.results.lock().await.contains_key(job_id) {
            Ok(JobStatus::Completed)
        } else {
            Err(QcsError::JobNotFound(job_id.0.clone()))
        }
    }

    async fn result(&self, job_id: &JobId) -> QcsResult<ExecutionData> {
        self.results
            .lock()
            .await
            .remove(job_id)
            .ok_or_else(|| QcsError::JobNotFound(job_id.0.clone()))
    }

    async fn cancel(&self, job_id: &JobId) -> QcsResult<()> {
        // Jobs finish during submit; there is nothing left to cancel.
        if self.results.lock().await.contains_key(job_id) {
            Ok(())
        } else {
            Err(QcsError::JobNotFound(job_id.0.clone()))
        }
    }
}
