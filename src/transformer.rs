//! Circuit-to-Quil transformation.
//!
//! A [`CircuitTransformer`] turns a [`Circuit`] into a Quil [`Program`] and
//! reports which memory region holds the readout for each measurement key.
//! [`QuilTransformer`] is the default; any
//! `Fn(&Circuit) -> QcsResult<TransformOutput>` closure works as well.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::circuit::{Circuit, Gate, Operation, Param};
use crate::error::{QcsError, QcsResult};
use crate::program::{Expression, Instruction, MemoryType, Program};

/// Where the readout of one measurement key lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementRegister {
    /// Measurement key from the circuit.
    pub key: String,
    /// Quil memory region name.
    pub region: String,
    /// Number of qubits measured under the key.
    pub width: usize,
}

/// Output of a transformation.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub program: Program,
    pub registers: Vec<MeasurementRegister>,
}

/// Transforms circuits into Quil programs.
pub trait CircuitTransformer: Send + Sync {
    fn transform(&self, circuit: &Circuit) -> QcsResult<TransformOutput>;
}

impl<F> CircuitTransformer for F
where
    F: Fn(&Circuit) -> QcsResult<TransformOutput> + Send + Sync,
{
    fn transform(&self, circuit: &Circuit) -> QcsResult<TransformOutput> {
        self(circuit)
    }
}

/// The default transformer: direct gate-by-gate Quil output.
pub fn default_transformer() -> Arc<dyn CircuitTransformer> {
    Arc::new(QuilTransformer::new())
}

/// Gate-by-gate Quil emitter.
///
/// Measurement keys map to `m0`, `m1`, ... in order of first appearance.
/// Symbolic parameters are emitted as references into `REAL[1]` regions
/// named after the symbol, so a parametric program can be compiled once and
/// re-run with different memory values.
#[derive(Debug, Clone, Default)]
pub struct QuilTransformer {
    qubit_id_map: Option<FxHashMap<u32, u32>>,
    active_reset: bool,
}

impl QuilTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relabel circuit qubits with hardware qubit IDs. Every qubit in a
    /// transformed circuit must be present in the map.
    pub fn with_qubit_id_map(mut self, map: FxHashMap<u32, u32>) -> Self {
        self.qubit_id_map = Some(map);
        self
    }

    /// Prepend a `RESET` to every program.
    pub fn with_active_reset(mut self, active_reset: bool) -> Self {
        self.active_reset = active_reset;
        self
    }

    fn map_qubit(&self, qubit: u32) -> QcsResult<u32> {
        match &self.qubit_id_map {
            None => Ok(qubit),
            Some(map) => map.get(&qubit).copied().ok_or_else(|| {
                QcsError::InvalidCircuit(format!("qubit {qubit} missing from qubit id map"))
            }),
        }
    }
}

impl CircuitTransformer for QuilTransformer {
    fn transform(&self, circuit: &Circuit) -> QcsResult<TransformOutput> {
        let mut program = Program::new();
        let mut registers: Vec<MeasurementRegister> = Vec::new();

        for symbol in circuit.parameters() {
            program.declare(symbol, MemoryType::Real, 1)?;
        }

        for op in circuit.operations() {
            if let Operation::Measure { qubits, key } = op {
                if registers.iter().any(|r| &r.key == key) {
                    return Err(QcsError::InvalidCircuit(format!(
                        "measurement key {key} used more than once"
                    )));
                }
                let region = format!("m{}", registers.len());
                program.declare(region.clone(), MemoryType::Bit, qubits.len())?;
                registers.push(MeasurementRegister {
                    key: key.clone(),
                    region,
                    width: qubits.len(),
                });
            }
        }

        if self.active_reset {
            program.push(Instruction::Reset);
        }

        let mut next_register = 0;
        for op in circuit.operations() {
            match op {
                Operation::Gate { gate, qubits } => {
                    let qubits = qubits
                        .iter()
                        .map(|&q| self.map_qubit(q))
                        .collect::<QcsResult<Vec<_>>>()?;
                    program.push(Instruction::Gate {
                        name: quil_name(gate).to_string(),
                        params: gate.param().map(expression).into_iter().collect(),
                        qubits,
                    });
                }
                Operation::Measure { qubits, .. } => {
                    let region = &registers[next_register].region;
                    for (index, &q) in qubits.iter().enumerate() {
                        program.push(Instruction::Measure {
                            qubit: self.map_qubit(q)?,
                            region: region.clone(),
                            index,
                        });
                    }
                    next_register += 1;
                }
            }
        }

        Ok(TransformOutput { program, registers })
    }
}

fn quil_name(gate: &Gate) -> &'static str {
    match gate {
        Gate::I => "I",
        Gate::X => "X",
        Gate::Y => "Y",
        Gate::Z => "Z",
        Gate::H => "H",
        Gate::S => "S",
        Gate::T => "T",
        Gate::Rx(_) => "RX",
        Gate::Ry(_) => "RY",
        Gate::Rz(_) => "RZ",
        Gate::Cz => "CZ",
        Gate::Cnot => "CNOT",
        Gate::Swap => "SWAP",
    }
}

fn expression(param: &Param) -> Expression {
    match param {
        Param::Value(v) => Expression::Number(*v),
        Param::Symbol(name) => Expression::MemoryRef {
            name: name.clone(),
            index: 0,
        },
    }
}
