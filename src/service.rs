//! The QCS service.
//!
//! [`RigettiQcsService`] runs a circuit on one quantum computer through an
//! executor and transformer, and exposes the QCS API lookups as associated
//! functions. Each lookup takes an optional client; with `None` a default
//! client is built from configuration and dropped when the call returns.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::api::models::{
    GetQuiltCalibrationsResponse, InstructionSetArchitecture, ListQuantumProcessorsResponse,
};
use crate::api::{QcsApi, provide_client};
use crate::circuit::Circuit;
use crate::error::QcsResult;
use crate::executor::{CircuitSweepExecutor, default_executor};
use crate::quantum_computer::QuantumComputer;
use crate::resolver::ParamResolver;
use crate::result::RunResult;
use crate::sampler::{RigettiQcsSampler, single_result};
use crate::transformer::{CircuitTransformer, default_transformer};

/// Runs circuits on a QCS quantum processor or QVM.
#[derive(Clone)]
pub struct RigettiQcsService {
    quantum_computer: Arc<QuantumComputer>,
    executor: Arc<dyn CircuitSweepExecutor>,
    transformer: Arc<dyn CircuitTransformer>,
}

impl fmt::Debug for RigettiQcsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigettiQcsService")
            .field("quantum_computer", &self.quantum_computer)
            .finish_non_exhaustive()
    }
}

impl RigettiQcsService {
    /// A service with the default executor and transformer.
    pub fn new(quantum_computer: impl Into<Arc<QuantumComputer>>) -> Self {
        Self {
            quantum_computer: quantum_computer.into(),
            executor: default_executor(),
            transformer: default_transformer(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CircuitSweepExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn CircuitTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn quantum_computer(&self) -> &QuantumComputer {
        &self.quantum_computer
    }

    /// Run `circuit` for `repetitions` shots with `param_resolver` bound.
    ///
    /// Fails with [`UnexpectedResultCount`](crate::QcsError::UnexpectedResultCount)
    /// if the executor does not return exactly one result.
    pub async fn run(
        &self,
        circuit: &Circuit,
        repetitions: u32,
        param_resolver: &ParamResolver,
    ) -> QcsResult<RunResult> {
        let results = self
            .executor
            .execute(
                &self.quantum_computer,
                circuit,
                std::slice::from_ref(param_resolver),
                repetitions,
                self.transformer.as_ref(),
            )
            .await?;
        single_result(results)
    }

    /// A sampler sharing this service's quantum computer and collaborators.
    pub fn sampler(&self) -> RigettiQcsSampler {
        RigettiQcsSampler::new(
            Arc::clone(&self.quantum_computer),
            Arc::clone(&self.executor),
            Arc::clone(&self.transformer),
        )
    }

    /// First page of quantum processors available to the caller.
    pub async fn list_quantum_processors(
        client: Option<&dyn QcsApi>,
    ) -> QcsResult<ListQuantumProcessorsResponse> {
        let mut slot = None;
        let client = provide_client(client, &mut slot)?;
        let response = client.list_quantum_processors(None, None).await?;
        debug!(
            count = response.quantum_processors.len(),
            "listed quantum processors"
        );
        Ok(response)
    }

    /// Quil-T calibrations of a quantum processor.
    pub async fn get_quilt_calibrations(
        quantum_processor_id: &str,
        client: Option<&dyn QcsApi>,
    ) -> QcsResult<GetQuiltCalibrationsResponse> {
        let mut slot = None;
        let client = provide_client(client, &mut slot)?;
        client.get_quilt_calibrations(quantum_processor_id).await
    }

    /// Instruction set architecture of a quantum processor.
    pub async fn get_instruction_set_architecture(
        quantum_processor_id: &str,
        client: Option<&dyn QcsApi>,
    ) -> QcsResult<InstructionSetArchitecture> {
        let mut slot = None;
        let client = provide_client(client, &mut slot)?;
        client
            .get_instruction_set_architecture(quantum_processor_id)
            .await
    }
}
