//! Building services from quantum processor names.

use std::sync::Arc;

use tracing::info;

use crate::api::QcsApi;
use crate::config::QcsConfig;
use crate::error::QcsResult;
use crate::executor::{CircuitSweepExecutor, default_executor};
use crate::quantum_computer::{GetQcOptions, QuantumComputer, get_qc};
use crate::service::RigettiQcsService;
use crate::transformer::{CircuitTransformer, default_transformer};

/// Options for [`get_rigetti_qcs_service`].
///
/// Unset collaborators fall back to their defaults; an unset `config` is
/// loaded with [`QcsConfig::load`].
#[derive(Default)]
pub struct ServiceOptions<'a> {
    /// Force (`Some(true)`) or forbid (`Some(false)`) a QVM.
    pub as_qvm: Option<bool>,
    /// Attach the generic noise model to a generic QVM.
    pub noisy: Option<bool>,
    pub executor: Option<Arc<dyn CircuitSweepExecutor>>,
    pub transformer: Option<Arc<dyn CircuitTransformer>>,
    pub config: Option<QcsConfig>,
    /// QCS API client used to fetch the instruction set architecture.
    pub client: Option<&'a dyn QcsApi>,
}

impl<'a> ServiceOptions<'a> {
    pub fn as_qvm(mut self, as_qvm: bool) -> Self {
        self.as_qvm = Some(as_qvm);
        self
    }

    pub fn noisy(mut self, noisy: bool) -> Self {
        self.noisy = Some(noisy);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn CircuitSweepExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn transformer(mut self, transformer: Arc<dyn CircuitTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn config(mut self, config: QcsConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn client(mut self, client: &'a dyn QcsApi) -> Self {
        self.client = Some(client);
        self
    }
}

pub(crate) type Collaborators = (
    QuantumComputer,
    Arc<dyn CircuitSweepExecutor>,
    Arc<dyn CircuitTransformer>,
);

pub(crate) async fn resolve_options(
    quantum_processor_id: &str,
    options: ServiceOptions<'_>,
) -> QcsResult<Collaborators> {
    let config = match options.config {
        Some(config) => {
            config.validate()?;
            config
        }
        None => QcsConfig::load(None)?,
    };
    let qc_options = GetQcOptions {
        as_qvm: options.as_qvm,
        noisy: options.noisy,
    };
    let quantum_computer = get_qc(quantum_processor_id, qc_options, &config, options.client).await?;

    Ok((
        quantum_computer,
        options.executor.unwrap_or_else(default_executor),
        options.transformer.unwrap_or_else(default_transformer),
    ))
}

/// Resolve `quantum_processor_id` and build a service for it.
///
/// Names follow [`get_qc`]: `Ankaa-3` is a QPU, `Ankaa-3-qvm` a QVM with its
/// topology, `9q-square-qvm` a generic 3×3 QVM.
///
/// # Example
///
/// ```no_run
/// # async fn demo() -> qcs_service::QcsResult<()> {
/// use qcs_service::{Circuit, ParamResolver, ServiceOptions, get_rigetti_qcs_service};
///
/// let service = get_rigetti_qcs_service("9q-square-qvm", ServiceOptions::default()).await?;
/// let bell = Circuit::new().h(0).cnot(0, 1).measure([0, 1], "m");
/// let result = service.run(&bell, 1000, &ParamResolver::new()).await?;
/// println!("{:?}", result.histogram("m"));
/// # Ok(())
/// # }
/// ```
pub async fn get_rigetti_qcs_service(
    quantum_processor_id: &str,
    options: ServiceOptions<'_>,
) -> QcsResult<RigettiQcsService> {
    let (quantum_computer, executor, transformer) =
        resolve_options(quantum_processor_id, options).await?;
    info!(qc = %quantum_computer.name(), "created QCS service");
    Ok(RigettiQcsService::new(quantum_computer)
        .with_executor(executor)
        .with_transformer(transformer))
}
