//! Sampler over a QCS quantum computer.
//!
//! [`RigettiQcsSampler`] runs circuits through a [`CircuitSweepExecutor`]
//! and [`CircuitTransformer`] pair, one [`RunResult`] per resolver.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::circuit::Circuit;
use crate::error::{QcsError, QcsResult};
use crate::executor::{CircuitSweepExecutor, default_executor};
use crate::factory::{ServiceOptions, resolve_options};
use crate::quantum_computer::QuantumComputer;
use crate::resolver::ParamResolver;
use crate::result::RunResult;
use crate::transformer::{CircuitTransformer, default_transformer};

/// Take the only result of a single-resolver execution.
pub(crate) fn single_result(mut results: Vec<RunResult>) -> QcsResult<RunResult> {
    match results.len() {
        1 => Ok(results.remove(0)),
        actual => Err(QcsError::UnexpectedResultCount {
            expected: 1,
            actual,
        }),
    }
}

/// Runs circuits and parameter sweeps on one quantum computer.
#[derive(Clone)]
pub struct RigettiQcsSampler {
    quantum_computer: Arc<QuantumComputer>,
    executor: Arc<dyn CircuitSweepExecutor>,
    transformer: Arc<dyn CircuitTransformer>,
}

impl fmt::Debug for RigettiQcsSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigettiQcsSampler")
            .field("quantum_computer", &self.quantum_computer.name())
            .finish_non_exhaustive()
    }
}

impl RigettiQcsSampler {
    pub fn new(
        quantum_computer: impl Into<Arc<QuantumComputer>>,
        executor: Arc<dyn CircuitSweepExecutor>,
        transformer: Arc<dyn CircuitTransformer>,
    ) -> Self {
        Self {
            quantum_computer: quantum_computer.into(),
            executor,
            transformer,
        }
    }

    /// A sampler with the default executor and transformer.
    pub fn with_defaults(quantum_computer: impl Into<Arc<QuantumComputer>>) -> Self {
        Self::new(quantum_computer, default_executor(), default_transformer())
    }

    pub fn quantum_computer(&self) -> &QuantumComputer {
        &self.quantum_computer
    }

    /// Run `circuit` once with `resolver` bound.
    pub async fn run(
        &self,
        circuit: &Circuit,
        repetitions: u32,
        resolver: &ParamResolver,
    ) -> QcsResult<RunResult> {
        let results = self
            .run_sweep(circuit, std::slice::from_ref(resolver), repetitions)
            .await?;
        single_result(results)
    }

    /// Run `circuit` once per resolver; results are in resolver order.
    pub async fn run_sweep(
        &self,
        circuit: &Circuit,
        resolvers: &[ParamResolver],
        repetitions: u32,
    ) -> QcsResult<Vec<RunResult>> {
        debug!(
            qc = %self.quantum_computer.name(),
            sweep = resolvers.len(),
            repetitions,
            "running sweep"
        );
        self.executor
            .execute(
                &self.quantum_computer,
                circuit,
                resolvers,
                repetitions,
                self.transformer.as_ref(),
            )
            .await
    }
}

/// Resolve `quantum_processor_id` and build a sampler for it.
///
/// Accepts the same names and options as
/// [`get_rigetti_qcs_service`](crate::factory::get_rigetti_qcs_service).
pub async fn get_rigetti_qcs_sampler(
    quantum_processor_id: &str,
    options: ServiceOptions<'_>,
) -> QcsResult<RigettiQcsSampler> {
    let (quantum_computer, executor, transformer) =
        resolve_options(quantum_processor_id, options).await?;
    Ok(RigettiQcsSampler::new(quantum_computer, executor, transformer))
}
