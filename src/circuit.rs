//! Minimal gate-model circuit representation.
//!
//! Qubits are plain `u32` indices. Rotation angles are [`Param`]s, which may
//! be concrete values or named symbols resolved later by a
//! [`ParamResolver`](crate::resolver::ParamResolver).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QcsError, QcsResult};
use crate::resolver::ParamResolver;

/// A gate parameter: either a concrete angle or a named symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    /// A concrete value (radians for rotations).
    Value(f64),
    /// A symbol to be resolved before or during execution.
    Symbol(String),
}

impl Param {
    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// The symbol name, if this parameter is symbolic.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Param::Symbol(s) => Some(s),
            Param::Value(_) => None,
        }
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Self::Value(v)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Self::Symbol(s.to_string())
    }
}

/// Supported gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gate {
    I,
    X,
    Y,
    Z,
    H,
    S,
    T,
    Rx(Param),
    Ry(Param),
    Rz(Param),
    Cz,
    Cnot,
    Swap,
}

impl Gate {
    /// Number of qubits this gate acts on.
    pub fn arity(&self) -> usize {
        match self {
            Gate::Cz | Gate::Cnot | Gate::Swap => 2,
            _ => 1,
        }
    }

    /// Lowercase gate name, matching [`GateSet`](crate::capability::GateSet) naming.
    pub fn name(&self) -> &'static str {
        match self {
            Gate::I => "i",
            Gate::X => "x",
            Gate::Y => "y",
            Gate::Z => "z",
            Gate::H => "h",
            Gate::S => "s",
            Gate::T => "t",
            Gate::Rx(_) => "rx",
            Gate::Ry(_) => "ry",
            Gate::Rz(_) => "rz",
            Gate::Cz => "cz",
            Gate::Cnot => "cnot",
            Gate::Swap => "swap",
        }
    }

    /// The parameter of a rotation gate.
    pub fn param(&self) -> Option<&Param> {
        match self {
            Gate::Rx(p) | Gate::Ry(p) | Gate::Rz(p) => Some(p),
            _ => None,
        }
    }

    fn with_param(&self, param: Param) -> Self {
        match self {
            Gate::Rx(_) => Gate::Rx(param),
            Gate::Ry(_) => Gate::Ry(param),
            Gate::Rz(_) => Gate::Rz(param),
            other => other.clone(),
        }
    }
}

/// A single circuit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// A gate applied to qubits.
    Gate { gate: Gate, qubits: Vec<u32> },
    /// A measurement of qubits recorded under `key`.
    Measure { qubits: Vec<u32>, key: String },
}

impl Operation {
    /// Qubits touched by this operation.
    pub fn qubits(&self) -> &[u32] {
        match self {
            Operation::Gate { qubits, .. } | Operation::Measure { qubits, .. } => qubits,
        }
    }

    /// Gate arity, distinct qubits and finite literal angles.
    fn check(&self) -> QcsResult<()> {
        match self {
            Operation::Gate { gate, qubits } => {
                if qubits.len() != gate.arity() {
                    return Err(QcsError::InvalidCircuit(format!(
                        "{} acts on {} qubit(s), got {}",
                        gate.name(),
                        gate.arity(),
                        qubits.len()
                    )));
                }
                if has_duplicates(qubits) {
                    return Err(QcsError::InvalidCircuit(format!(
                        "{} applied to repeated qubits {qubits:?}",
                        gate.name()
                    )));
                }
                if let Some(Param::Value(v)) = gate.param() {
                    if !v.is_finite() {
                        return Err(QcsError::InvalidCircuit(format!(
                            "{} angle is {v}",
                            gate.name()
                        )));
                    }
                }
                Ok(())
            }
            Operation::Measure { qubits, .. } => {
                if qubits.is_empty() {
                    return Err(QcsError::InvalidCircuit("measurement of zero qubits".into()));
                }
                if has_duplicates(qubits) {
                    return Err(QcsError::InvalidCircuit(format!(
                        "measurement of repeated qubits {qubits:?}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// An ordered list of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    operations: Vec<Operation>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a gate, checking arity and that the qubits are distinct.
    pub fn push_gate(&mut self, gate: Gate, qubits: Vec<u32>) -> QcsResult<()> {
        let op = Operation::Gate { gate, qubits };
        op.check()?;
        self.operations.push(op);
        Ok(())
    }

    /// Append a measurement of `qubits` under `key`.
    pub fn push_measure(&mut self, qubits: Vec<u32>, key: impl Into<String>) -> QcsResult<()> {
        let op = Operation::Measure {
            qubits,
            key: key.into(),
        };
        op.check()?;
        self.operations.push(op);
        Ok(())
    }

    /// Check every operation the way [`push_gate`](Self::push_gate) and
    /// [`push_measure`](Self::push_measure) do. The chaining builders skip
    /// these checks, so executors call this before transforming.
    pub fn check(&self) -> QcsResult<()> {
        self.operations.iter().try_for_each(Operation::check)
    }

    fn gate(mut self, gate: Gate, qubits: Vec<u32>) -> Self {
        self.operations.push(Operation::Gate { gate, qubits });
        self
    }

    pub fn i(self, q: u32) -> Self {
        self.gate(Gate::I, vec![q])
    }

    pub fn x(self, q: u32) -> Self {
        self.gate(Gate::X, vec![q])
    }

    pub fn y(self, q: u32) -> Self {
        self.gate(Gate::Y, vec![q])
    }

    pub fn z(self, q: u32) -> Self {
        self.gate(Gate::Z, vec![q])
    }

    pub fn h(self, q: u32) -> Self {
        self.gate(Gate::H, vec![q])
    }

    pub fn s(self, q: u32) -> Self {
        self.gate(Gate::S, vec![q])
    }

    pub fn t(self, q: u32) -> Self {
        self.gate(Gate::T, vec![q])
    }

    pub fn rx(self, q: u32, theta: impl Into<Param>) -> Self {
        self.gate(Gate::Rx(theta.into()), vec![q])
    }

    pub fn ry(self, q: u32, theta: impl Into<Param>) -> Self {
        self.gate(Gate::Ry(theta.into()), vec![q])
    }

    pub fn rz(self, q: u32, theta: impl Into<Param>) -> Self {
        self.gate(Gate::Rz(theta.into()), vec![q])
    }

    pub fn cz(self, control: u32, target: u32) -> Self {
        self.gate(Gate::Cz, vec![control, target])
    }

    pub fn cnot(self, control: u32, target: u32) -> Self {
        self.gate(Gate::Cnot, vec![control, target])
    }

    pub fn swap(self, a: u32, b: u32) -> Self {
        self.gate(Gate::Swap, vec![a, b])
    }

    /// Measure `qubits` under `key`.
    pub fn measure(mut self, qubits: impl IntoIterator<Item = u32>, key: impl Into<String>) -> Self {
        self.operations.push(Operation::Measure {
            qubits: qubits.into_iter().collect(),
            key: key.into(),
        });
        self
    }

    /// Operations in order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether the circuit has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// All qubits touched by the circuit.
    pub fn qubits(&self) -> BTreeSet<u32> {
        self.operations
            .iter()
            .flat_map(|op| op.qubits().iter().copied())
            .collect()
    }

    /// One more than the highest qubit index used, or 0 for an empty circuit.
    pub fn num_qubits(&self) -> u32 {
        self.qubits().last().map_or(0, |q| q + 1)
    }

    /// Names of all unresolved symbols.
    pub fn parameters(&self) -> BTreeSet<String> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Gate { gate, .. } => gate.param().and_then(Param::as_symbol),
                Operation::Measure { .. } => None,
            })
            .map(str::to_string)
            .collect()
    }

    /// Whether any gate parameter is symbolic.
    pub fn is_parameterized(&self) -> bool {
        !self.parameters().is_empty()
    }

    /// Measurement keys in order of first appearance.
    pub fn measurement_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for op in &self.operations {
            if let Operation::Measure { key, .. } = op {
                if !keys.contains(&key.as_str()) {
                    keys.push(key.as_str());
                }
            }
        }
        keys
    }

    /// Replace every symbol with its value from `resolver`.
    pub fn resolve(&self, resolver: &ParamResolver) -> QcsResult<Circuit> {
        let operations = self
            .operations
            .iter()
            .map(|op| -> QcsResult<Operation> {
                match op {
                    Operation::Gate { gate, qubits } => {
                        let gate = match gate.param() {
                            Some(param @ Param::Symbol(_)) => {
                                gate.with_param(Param::Value(resolver.resolve(param)?))
                            }
                            _ => gate.clone(),
                        };
                        Ok(Operation::Gate {
                            gate,
                            qubits: qubits.clone(),
                        })
                    }
                    measure => Ok(measure.clone()),
                }
            })
            .collect::<QcsResult<Vec<_>>>()?;
        Ok(Circuit { operations })
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.operations {
            match op {
                Operation::Gate { gate, qubits } => match gate.param() {
                    Some(Param::Value(v)) => writeln!(f, "{}({v}) {qubits:?}", gate.name())?,
                    Some(Param::Symbol(s)) => writeln!(f, "{}({s}) {qubits:?}", gate.name())?,
                    None => writeln!(f, "{} {qubits:?}", gate.name())?,
                },
                Operation::Measure { qubits, key } => writeln!(f, "measure {qubits:?} -> {key}")?,
            }
        }
        Ok(())
    }
}

fn has_duplicates(qubits: &[u32]) -> bool {
    let unique: BTreeSet<_> = qubits.iter().collect();
    unique.len() != qubits.len()
}
