//! QCS Service - run circuits on Rigetti QCS quantum processors and QVMs
//!
//! This crate wraps a Rigetti QCS quantum computer in a small service: a
//! [`RigettiQcsService`] holds a [`QuantumComputer`] together with a
//! [`CircuitSweepExecutor`] and a [`CircuitTransformer`], and runs
//! [`Circuit`]s through them. It also exposes the QCS API lookups for
//! device metadata.
//!
//! # Overview
//!
//! - [`get_rigetti_qcs_service`] resolves a name such as `Ankaa-3`,
//!   `Ankaa-3-qvm` or `9q-square-qvm` and builds a service
//! - [`RigettiQcsService::run`] runs a circuit under one [`ParamResolver`]
//! - [`RigettiQcsSampler`] runs parameter sweeps
//! - [`RigettiQcsService::list_quantum_processors`],
//!   [`RigettiQcsService::get_quilt_calibrations`] and
//!   [`RigettiQcsService::get_instruction_set_architecture`] query the QCS API
//! - [`QcsError`] groups failures by how a caller can recover
//!
//! # Pipeline
//!
//! ```text
//!   Circuit ──→ resolve ──→ transform ──→ compile ──→ run ──→ RunResult
//!            (ParamResolver) (Quil)       (quilc)     (QAM)
//! ```
//!
//! Which steps run, and how often, depends on the executor; see
//! [`executor`].
//!
//! # Lookups
//!
//! Every lookup takes `Option<&dyn QcsApi>`. Passing `None` builds a
//! [`QcsApiClient`](api::QcsApiClient) from [`QcsConfig::load`] for the
//! duration of the call.

pub mod api;
pub mod capability;
pub mod circuit;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod factory;
pub mod http;
pub mod job;
pub mod program;
pub mod qam;
pub mod qpu;
pub mod quantum_computer;
pub mod qvm;
pub mod resolver;
pub mod result;
pub mod sampler;
pub mod service;
pub mod transformer;

#[cfg(test)]
mod testing;

pub use api::QcsApi;
pub use capability::{Capabilities, GateSet, NoiseProfile, Topology, TopologyKind};
pub use circuit::{Circuit, Gate, Operation, Param};
pub use config::QcsConfig;
pub use error::{QcsError, QcsResult};
pub use executor::{
    CircuitSweepExecutor, WithQuilcCompilationAndParameterResolution,
    WithQuilcParametricCompilation, WithoutQuilcCompilation, default_executor,
};
pub use factory::{ServiceOptions, get_rigetti_qcs_service};
pub use job::{JobId, JobStatus};
pub use program::{MemoryMap, Program};
pub use quantum_computer::{GetQcOptions, QuantumComputer, ValidationResult, get_qc};
pub use resolver::{ParamResolver, linspace};
pub use result::{Counts, ExecutionData, RunResult};
pub use sampler::{RigettiQcsSampler, get_rigetti_qcs_sampler};
pub use service::RigettiQcsService;
pub use transformer::{CircuitTransformer, QuilTransformer, TransformOutput, default_transformer};
