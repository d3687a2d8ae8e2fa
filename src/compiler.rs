//! Quil compilation.
//!
//! A [`Compiler`] rewrites a program into the native gate set and
//! connectivity of a target. [`QuilcClient`] delegates to a quilc server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::Capabilities;
use crate::config::QcsConfig;
use crate::error::QcsResult;
use crate::http::HttpClient;
use crate::program::Program;

/// Compiles Quil programs for a target.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, program: &Program, target: &Capabilities) -> QcsResult<Program>;
}

#[derive(Debug, Serialize)]
struct TargetDevice<'a> {
    qubits: &'a [u32],
    edges: Vec<(u32, u32)>,
    native_gates: &'a [String],
}

#[derive(Debug, Serialize)]
struct CompileRequest<'a> {
    program: String,
    target_device: TargetDevice<'a>,
}

#[derive(Debug, Deserialize)]
struct CompileResponse {
    program: String,
}

/// HTTP client for a quilc server.
#[derive(Debug, Clone)]
pub struct QuilcClient {
    http: HttpClient,
}

impl QuilcClient {
    /// Create a client for the server at `config.quilc_url`.
    pub fn new(config: &QcsConfig) -> QcsResult<Self> {
        Ok(Self {
            http: HttpClient::new(&config.quilc_url, config)?,
        })
    }
}

fn compile_request<'a>(program: &Program, target: &'a Capabilities) -> CompileRequest<'a> {
    CompileRequest {
        program: program.to_quil(),
        target_device: TargetDevice {
            qubits: &target.qubits,
            edges: target.topology.coupled_pairs(&target.qubits),
            native_gates: &target.gate_set.native,
        },
    }
}

#[async_trait]
impl Compiler for QuilcClient {
    async fn compile(&self, program: &Program, target: &Capabilities) -> QcsResult<Program> {
        let request = compile_request(program, target);
        debug!(device = %target.name, "compiling program with quilc");
        let response: CompileResponse = self.http.post_json("compile", "/compile", &request).await?;
        Program::from_quil(&response.program)
    }
}
