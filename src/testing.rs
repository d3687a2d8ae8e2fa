//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rustc_hash::FxHashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::api::QcsApi;
use crate::api::models::{
    Architecture, Edge, GetQuiltCalibrationsResponse, InstructionSetArchitecture,
    ListQuantumProcessorsResponse, Node, Operation, QuantumProcessor,
};
use crate::capability::Capabilities;
use crate::compiler::Compiler;
use crate::error::{QcsError, QcsResult};
use crate::job::{JobId, JobStatus};
use crate::program::Program;
use crate::qam::{Availability, Qam};
use crate::result::ExecutionData;

fn not_found(operation: &str, id: &str) -> QcsError {
    QcsError::Api {
        operation: operation.to_string(),
        status: 404,
        message: format!("{id} not found"),
    }
}

/// Serves canned QCS API responses and records requests.
#[derive(Default)]
pub struct MockApi {
    pages: Vec<ListQuantumProcessorsResponse>,
    isas: FxHashMap<String, InstructionSetArchitecture>,
    calibrations: FxHashMap<String, GetQuiltCalibrationsResponse>,
    page_tokens: Mutex<Vec<Option<String>>>,
    isa_requests: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page; pages are served in order.
    pub fn with_processor_page(mut self, ids: &[&str], next: Option<&str>) -> Self {
        self.pages.push(ListQuantumProcessorsResponse {
            quantum_processors: ids
                .iter()
                .map(|id| QuantumProcessor { id: id.to_string() })
                .collect(),
            next_page_token: next.map(str::to_string),
        });
        self
    }

    pub fn with_isa(mut self, isa: InstructionSetArchitecture) -> Self {
        self.isas.insert(isa.name.clone(), isa);
        self
    }

    pub fn with_calibrations(mut self, id: &str, quilt: &str) -> Self {
        self.calibrations.insert(
            id.to_string(),
            GetQuiltCalibrationsResponse {
                quilt: quilt.to_string(),
                settings_timestamp: Some(Utc::now()),
            },
        );
        self
    }

    /// An ISA with `n` qubits in a line and RX/RZ/CZ/MEASURE instructions.
    pub fn linear_isa(name: &str, n: u32) -> InstructionSetArchitecture {
        let op = |name: &str| Operation {
            name: name.to_string(),
            node_count: None,
            parameters: vec![],
            sites: vec![],
            characteristics: vec![],
        };
        InstructionSetArchitecture {
            name: name.to_string(),
            architecture: Architecture {
                family: Some("Ankaa".into()),
                nodes: (0..n).map(|node_id| Node { node_id }).collect(),
                edges: (1..n)
                    .map(|i| Edge {
                        node_ids: vec![i - 1, i],
                    })
                    .collect(),
            },
            instructions: vec![op("RX"), op("RZ"), op("CZ"), op("MEASURE")],
            benchmarks: vec![],
        }
    }

    pub fn page_tokens(&self) -> Vec<Option<String>> {
        self.page_tokens.lock().unwrap().clone()
    }

    pub fn isa_requests(&self) -> Vec<String> {
        self.isa_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QcsApi for MockApi {
    async fn list_quantum_processors(
        &self,
        _page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> QcsResult<ListQuantumProcessorsResponse> {
        let mut tokens = self.page_tokens.lock().unwrap();
        let index = tokens.len();
        tokens.push(page_token.map(str::to_string));
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    async fn get_instruction_set_architecture(
        &self,
        quantum_processor_id: &str,
    ) -> QcsResult<InstructionSetArchitecture> {
        self.isa_requests
            .lock()
            .unwrap()
            .push(quantum_processor_id.to_string());
        self.isas
            .get(quantum_processor_id)
            .cloned()
            .ok_or_else(|| not_found("get_instruction_set_architecture", quantum_processor_id))
    }

    async fn get_quilt_calibrations(
        &self,
        quantum_processor_id: &str,
    ) -> QcsResult<GetQuiltCalibrationsResponse> {
        self.calibrations
            .get(quantum_processor_id)
            .cloned()
            .ok_or_else(|| not_found("get_quilt_calibrations", quantum_processor_id))
    }
}

/// Records submitted programs and answers with deterministic readout.
///
/// Shot `i` reads `i % 2` on every bit of every readout region.
#[derive(Default)]
pub struct RecordingQam {
    submitted: Mutex<Vec<(String, u32)>>,
    results: Mutex<FxHashMap<JobId, ExecutionData>>,
}

impl RecordingQam {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(quil, shots)` for every submission, in order.
    pub fn submitted(&self) -> Vec<(String, u32)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Qam for RecordingQam {
    fn name(&self) -> &str {
        "recording"
    }

    async fn availability(&self) -> QcsResult<Availability> {
        Ok(Availability::available(None))
    }

    async fn submit(&self, program: &Program, shots: u32) -> QcsResult<JobId> {
        let mut readout = FxHashMap::default();
        for decl in program.declarations() {
            if program.readout_regions().contains(&decl.name.as_str()) {
                let rows = (0..shots)
                    .map(|i| vec![i64::from(i % 2); decl.size])
                    .collect();
                readout.insert(decl.name.clone(), rows);
            }
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push((program.to_quil(), shots));
        let job_id = JobId::new(format!("job-{}", submitted.len()));
        self.results
            .lock()
            .unwrap()
            .insert(job_id.clone(), ExecutionData::new(readout));
        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> QcsResult<JobStatus> {
        if self.results.lock().unwrap().contains_key(job_id) {
            Ok(JobStatus::Completed)
        } else {
            Err(QcsError::JobNotFound(job_id.0.clone()))
        }
    }

    async fn result(&self, job_id: &JobId) -> QcsResult<ExecutionData> {
        self.results
            .lock()
            .unwrap()
            .remove(job_id)
            .ok_or_else(|| QcsError::JobNotFound(job_id.0.clone()))
    }

    async fn cancel(&self, _job_id: &JobId) -> QcsResult<()> {
        Ok(())
    }
}

/// Returns the program unchanged (round-tripped through Quil text) and
/// counts calls.
#[derive(Default)]
pub struct EchoCompiler {
    calls: AtomicUsize,
}

impl EchoCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compiler for EchoCompiler {
    async fn compile(&self, program: &Program, _target: &Capabilities) -> QcsResult<Program> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Program::from_quil(&program.to_quil())
    }
}

/// A local HTTP server answering each connection with the next canned
/// `(status, body)`. The last response repeats once the list runs out.
pub struct CannedServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    pub async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        tokio::spawn(async move {
            let mut responses = responses.into_iter();
            let mut last = (200, "{}");
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let request_line = String::from_utf8_lossy(&head)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                log.lock().unwrap().push(request_line);

                let (status, body) = responses.next().unwrap_or(last);
                last = (status, body);
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { url, requests }
    }

    /// Request lines (`GET /path?query HTTP/1.1`) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}
