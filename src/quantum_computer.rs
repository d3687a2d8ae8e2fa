//! Quantum computer handles and name resolution.
//!
//! A [`QuantumComputer`] pairs a [`Compiler`] with a [`Qam`] and the
//! [`Capabilities`] of the target they share. [`get_qc`] builds one from a
//! name such as `Ankaa-3`, `Ankaa-3-qvm`, `9q-square-qvm` or `4q-noisy-qvm`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{QcsApi, provide_client};
use crate::capability::{Capabilities, NoiseProfile};
use crate::compiler::{Compiler, QuilcClient};
use crate::config::QcsConfig;
use crate::error::{QcsError, QcsResult};
use crate::program::{Instruction, MemoryMap, Program};
use crate::qam::{Availability, Qam};
use crate::qpu::QpuClient;
use crate::qvm::QvmClient;
use crate::result::ExecutionData;

/// Result of checking a program against a target.
///
/// - `Valid`: the program can run as-is.
/// - `Invalid`: the program cannot run on this target.
/// - `RequiresTranspilation`: the program must be compiled first.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid,
    Invalid { reasons: Vec<String> },
    RequiresTranspilation { details: String },
}

impl ValidationResult {
    /// Check if the program is valid (can be submitted as-is).
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// A compiler and an execution target bound together.
#[derive(Clone)]
pub struct QuantumComputer {
    name: String,
    capabilities: Capabilities,
    compiler: Arc<dyn Compiler>,
    qam: Arc<dyn Qam>,
}

impl fmt::Debug for QuantumComputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantumComputer")
            .field("name", &self.name)
            .field("qam", &self.qam.name())
            .field("is_qvm", &self.is_qvm())
            .finish()
    }
}

impl QuantumComputer {
    pub fn new(
        name: impl Into<String>,
        capabilities: Capabilities,
        compiler: Arc<dyn Compiler>,
        qam: Arc<dyn Qam>,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities,
            compiler,
            qam,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn qam(&self) -> &dyn Qam {
        self.qam.as_ref()
    }

    /// Whether programs run on a simulator.
    pub fn is_qvm(&self) -> bool {
        self.capabilities.is_simulator
    }

    pub async fn availability(&self) -> QcsResult<Availability> {
        self.qam.availability().await
    }

    /// Check a program's gates and qubits against the target.
    ///
    /// Unknown qubits and unsupported gates make a program invalid. Gates
    /// outside the native set and two-qubit gates on uncoupled pairs
    /// require compilation. Raw instructions are not inspected.
    pub fn validate(&self, program: &Program) -> ValidationResult {
        let caps = &self.capabilities;
        let mut reasons = Vec::new();
        let mut needs_compilation = Vec::new();

        for instruction in program.instructions() {
            match instruction {
                Instruction::Gate { name, qubits, .. } => {
                    let gate = name.to_lowercase();
                    if !caps.gate_set.contains(&gate) {
                        reasons.push(format!("unsupported gate {name}"));
                    } else if !caps.gate_set.is_native(&gate) {
                        needs_compilation.push(format!("{name} is not native"));
                    }
                    for &q in qubits {
                        if !caps.has_qubit(q) {
                            reasons.push(format!("qubit {q} does not exist on {}", caps.name));
                        }
                    }
                    if let [a, b] = qubits.as_slice() {
                        if !caps.topology.is_connected(*a, *b) {
                            needs_compilation.push(format!("qubits {a} and {b} are not coupled"));
                        }
                    }
                }
                Instruction::Measure { qubit, .. } if !caps.has_qubit(*qubit) => {
                    reasons.push(format!(
                        "qubit {qubit} does not exist on {}",
                        caps.name
                    ));
                }
                _ => {}
            }
        }

        if !reasons.is_empty() {
            reasons.dedup();
            ValidationResult::Invalid { reasons }
        } else if !needs_compilation.is_empty() {
            needs_compilation.dedup();
            ValidationResult::RequiresTranspilation {
                details: needs_compilation.join("; "),
            }
        } else {
            ValidationResult::Valid
        }
    }

    /// Compile a program for this target.
    pub async fn compile(&self, program: &Program) -> QcsResult<Program> {
        self.compiler.compile(program, &self.capabilities).await
    }

    /// Run an executable for `shots` repetitions, writing `memory` first.
    pub async fn run(
        &self,
        executable: &Program,
        shots: u32,
        memory: &MemoryMap,
    ) -> QcsResult<ExecutionData> {
        if shots == 0 || shots > self.capabilities.max_shots {
            return Err(QcsError::InvalidShots(format!(
                "shots must be 1..={}, got {shots}",
                self.capabilities.max_shots
            )));
        }

        let job_id = if memory.is_empty() {
            self.qam.submit(executable, shots).await?
        } else {
            self.qam.submit(&executable.with_memory(memory)?, shots).await?
        };
        debug!(job_id = %job_id, qc = %self.name, "waiting for job");
        self.qam.wait(&job_id).await
    }
}

/// Options for [`get_qc`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GetQcOptions {
    /// Force (`Some(true)`) or forbid (`Some(false)`) a QVM.
    pub as_qvm: Option<bool>,
    /// Attach the generic noise model (generic QVMs only).
    pub noisy: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    /// `Nq` or `Nq-square`, which only exist as QVMs.
    Generic(u32, bool),
    /// A QCS quantum processor ID.
    Processor(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Resolution {
    target: Target,
    qvm: bool,
    noisy: bool,
}

fn resolve_name(name: &str, options: GetQcOptions) -> QcsResult<Resolution> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QcsError::InvalidName("empty quantum computer name".into()));
    }
    if name.ends_with("-pyqvm") {
        return Err(QcsError::Unsupported(format!(
            "{name}: in-process simulators are not available; use a -qvm name"
        )));
    }

    let (base, qvm_suffix, noisy_suffix) = if let Some(base) = name.strip_suffix("-noisy-qvm") {
        (base, true, true)
    } else if let Some(base) = name.strip_suffix("-qvm") {
        (base, true, false)
    } else {
        (name, false, false)
    };

    if qvm_suffix && options.as_qvm == Some(false) {
        return Err(QcsError::InvalidName(format!(
            "{name} names a QVM, but as_qvm is false"
        )));
    }
    let qvm = qvm_suffix || options.as_qvm == Some(true);
    let noisy = noisy_suffix || options.noisy == Some(true);

    let target = match parse_generic(base)? {
        Some((n, square)) => {
            if !qvm {
                return Err(QcsError::InvalidName(format!(
                    "{base} is only available as a QVM; use {base}-qvm or as_qvm"
                )));
            }
            Target::Generic(n, square)
        }
        None => Target::Processor(base.to_string()),
    };

    if noisy && !qvm {
        return Err(QcsError::Unsupported(format!(
            "{name}: noise models are only available on QVMs"
        )));
    }

    Ok(Resolution { target, qvm, noisy })
}

/// Largest `N` accepted in an `Nq` / `Nq-square` name. A wavefunction QVM
/// cannot simulate much beyond a few dozen qubits.
pub const MAX_GENERIC_QUBITS: u32 = 64;

/// Parse `Nq` / `Nq-square`. Returns `(N, is_square)`.
fn parse_generic(base: &str) -> QcsResult<Option<(u32, bool)>> {
    let (prefix, square) = match base.strip_suffix("-square") {
        Some(prefix) => (prefix, true),
        None => (base, false),
    };
    let Some(digits) = prefix.strip_suffix('q') else {
        return Ok(None);
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Ok(None);
    }
    let n: u32 = digits
        .parse()
        .map_err(|_| QcsError::InvalidName(format!("{base}: qubit count out of range")))?;
    if n == 0 {
        return Err(QcsError::InvalidName(format!("{base}: zero qubits")));
    }
    if n > MAX_GENERIC_QUBITS {
        return Err(QcsError::InvalidName(format!(
            "{base}: generic QVMs have at most {MAX_GENERIC_QUBITS} qubits"
        )));
    }
    if square && integer_sqrt(n).pow(2) != n {
        return Err(QcsError::InvalidName(format!(
            "{base}: {n} is not a perfect square"
        )));
    }
    Ok(Some((n, square)))
}

fn integer_sqrt(n: u32) -> u32 {
    let n = u64::from(n);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut root = (n as f64).sqrt() as u64;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    #[allow(clippy::cast_possible_truncation)]
    let root = root as u32;
    root
}

/// Resolve a quantum computer name into a handle.
///
/// - `<name>-qvm` is a QVM; `<name>-noisy-qvm` is a noisy QVM.
/// - `Nq` / `Nq-square` are generic fully connected / grid QVMs.
/// - Anything else is a QCS quantum processor, whose instruction set
///   architecture is fetched through `client` (or a default client).
/// - `options.as_qvm == Some(true)` turns a processor into a QVM with the
///   same topology.
/// - `noisy` applies only to generic QVMs; it is accepted and ignored for
///   processor-based QVMs and rejected for QPUs.
pub async fn get_qc(
    name: &str,
    options: GetQcOptions,
    config: &QcsConfig,
    client: Option<&dyn QcsApi>,
) -> QcsResult<QuantumComputer> {
    let resolution = resolve_name(name, options)?;
    let compiler: Arc<dyn Compiler> = Arc::new(QuilcClient::new(config)?);

    let qc = match resolution.target {
        Target::Generic(n, square) => {
            let mut capabilities = if square {
                Capabilities::square_qvm(integer_sqrt(n))
            } else {
                Capabilities::generic_qvm(n)
            };
            let qvm = if resolution.noisy {
                if let Some(stem) = capabilities.name.strip_suffix("-qvm") {
                    capabilities.name = format!("{stem}-noisy-qvm");
                }
                let profile = NoiseProfile::generic_qvm();
                let qvm = QvmClient::new(capabilities.name.clone(), config)?.with_noise(&profile);
                capabilities = capabilities.with_noise_profile(profile);
                qvm
            } else {
                QvmClient::new(capabilities.name.clone(), config)?
            };
            QuantumComputer::new(capabilities.name.clone(), capabilities, compiler, Arc::new(qvm))
        }
        Target::Processor(id) => {
            let mut slot = None;
            let api = provide_client(client, &mut slot)?;
            let isa = api.get_instruction_set_architecture(&id).await?;
            let capabilities = Capabilities::from_isa(&isa);

            if resolution.qvm {
                if resolution.noisy {
                    debug!(processor = %id, "noise model ignored for ISA-based QVM");
                }
                let name = format!("{id}-qvm");
                let qvm = QvmClient::new(name.clone(), config)?;
                QuantumComputer::new(name, capabilities.into_qvm(), compiler, Arc::new(qvm))
            } else {
                let qpu = QpuClient::new(id.clone(), config)?;
                QuantumComputer::new(id, capabilities, compiler, Arc::new(qpu))
            }
        }
    };

    info!(qc = %qc.name(), is_qvm = qc.is_qvm(), "resolved quantum computer");
    Ok(qc)
}
