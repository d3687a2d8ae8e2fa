//! Quantum computer capability introspection.
//!
//! [`Capabilities`] describe what a quantum computer handle can run: qubit
//! count, gates, connectivity and coarse noise numbers. They are built either
//! from a generic QVM shape or from a processor's
//! [`InstructionSetArchitecture`].
//!
//! All edges in [`Topology`] are bidirectional.

use serde::{Deserialize, Serialize};

use crate::api::models::InstructionSetArchitecture;

/// Shot limit applied to every Rigetti target.
pub const MAX_SHOTS: u32 = 100_000;

/// What a quantum computer handle can run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Processor ID or QVM name.
    pub name: String,
    /// Qubit indices, sorted.
    pub qubits: Vec<u32>,
    pub gate_set: GateSet,
    pub topology: Topology,
    /// Shot limit per job.
    pub max_shots: u32,
    /// `true` for QVMs, including QVMs emulating a processor.
    pub is_simulator: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_profile: Option<NoiseProfile>,
}

impl Capabilities {
    /// A fully connected `num_qubits` QVM (`Nq-qvm`).
    pub fn generic_qvm(num_qubits: u32) -> Self {
        Self {
            name: format!("{num_qubits}q-qvm"),
            qubits: (0..num_qubits).collect(),
            gate_set: GateSet::qvm(),
            topology: Topology::full(),
            max_shots: MAX_SHOTS,
            is_simulator: true,
            noise_profile: None,
        }
    }

    /// A `side` × `side` grid QVM (`9q-square-qvm` for `side == 3`).
    pub fn square_qvm(side: u32) -> Self {
        let num_qubits = side * side;
        Self {
            name: format!("{num_qubits}q-square-qvm"),
            qubits: (0..num_qubits).collect(),
            gate_set: GateSet::qvm(),
            topology: Topology::grid(side, side),
            max_shots: MAX_SHOTS,
            is_simulator: true,
            noise_profile: None,
        }
    }

    /// Capabilities of a QCS quantum processor described by its ISA.
    pub fn from_isa(isa: &InstructionSetArchitecture) -> Self {
        let mut qubits: Vec<u32> = isa.architecture.nodes.iter().map(|n| n.node_id).collect();
        qubits.sort_unstable();

        let edges = isa
            .architecture
            .edges
            .iter()
            .filter_map(|e| match e.node_ids.as_slice() {
                [a, b] => Some((*a, *b)),
                _ => None,
            });

        Self {
            name: isa.name.clone(),
            qubits,
            gate_set: GateSet::from_isa(isa),
            topology: Topology::custom(edges),
            max_shots: MAX_SHOTS,
            is_simulator: false,
            noise_profile: NoiseProfile::from_isa(isa),
        }
    }

    /// Mark these capabilities as a QVM emulating the described target.
    pub fn into_qvm(mut self) -> Self {
        self.is_simulator = true;
        self
    }

    /// Number of qubits on the target.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Whether `qubit` exists on the target.
    pub fn has_qubit(&self, qubit: u32) -> bool {
        self.qubits.binary_search(&qubit).is_ok()
    }

    pub fn with_noise_profile(mut self, profile: NoiseProfile) -> Self {
        self.noise_profile = Some(profile);
        self
    }
}

/// Gate names (lowercase) a target accepts.
///
/// `single_qubit` and `two_qubit` list what the QVM can simulate; any of them
/// can be compiled for hardware. `native` lists what a processor runs
/// directly. An empty `native` list means everything accepted is native.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSet {
    pub single_qubit: Vec<String>,
    pub two_qubit: Vec<String>,
    pub native: Vec<String>,
}

const QVM_SINGLE_QUBIT: [&str; 10] = ["i", "x", "y", "z", "h", "s", "t", "rx", "ry", "rz"];
const QVM_TWO_QUBIT: [&str; 3] = ["cz", "cnot", "swap"];

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|name| (*name).to_string()).collect()
}

impl GateSet {
    /// Everything the QVM can simulate directly.
    pub fn qvm() -> Self {
        Self {
            single_qubit: names(&QVM_SINGLE_QUBIT),
            two_qubit: names(&QVM_TWO_QUBIT),
            native: Vec::new(),
        }
    }

    /// Native gates from an ISA. Anything the QVM gate set covers is
    /// supported through compilation.
    pub fn from_isa(isa: &InstructionSetArchitecture) -> Self {
        let mut native: Vec<String> = isa
            .instructions
            .iter()
            .map(|op| op.name.to_lowercase())
            .filter(|name| name != "measure")
            .collect();
        native.sort();
        native.dedup();
        Self {
            native,
            ..Self::qvm()
        }
    }

    pub fn contains(&self, gate: &str) -> bool {
        [&self.single_qubit, &self.two_qubit, &self.native]
            .into_iter()
            .flatten()
            .any(|g| g == gate)
    }

    /// Whether `gate` runs without compilation.
    pub fn is_native(&self, gate: &str) -> bool {
        match self.native.as_slice() {
            [] => self.contains(gate),
            native => native.iter().any(|g| g == gate),
        }
    }
}

/// Qubit couplings. Edges are undirected and stored with the lower index
/// first. A fully connected topology stores no edges; see
/// [`Topology::coupled_pairs`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub kind: TopologyKind,
    pub edges: Vec<(u32, u32)>,
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Topology {
    /// Every pair of qubits coupled (`Nq-qvm`).
    pub fn full() -> Self {
        Self {
            kind: TopologyKind::FullyConnected,
            edges: Vec::new(),
        }
    }

    /// Nearest-neighbor couplings on a `rows` × `cols` lattice, qubits
    /// numbered row by row (`Nq-square-qvm`).
    pub fn grid(rows: u32, cols: u32) -> Self {
        let mut edges = Vec::new();
        for q in 0..rows * cols {
            let (row, col) = (q / cols, q % cols);
            if col + 1 < cols {
                edges.push((q, q + 1));
            }
            if row + 1 < rows {
                edges.push((q, q + cols));
            }
        }
        Self {
            kind: TopologyKind::Grid { rows, cols },
            edges,
        }
    }

    /// Couplings taken from a processor's architecture edges.
    pub fn custom(edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut edges: Vec<_> = edges.into_iter().map(|(a, b)| ordered(a, b)).collect();
        edges.sort_unstable();
        edges.dedup();
        Self {
            kind: TopologyKind::Custom,
            edges,
        }
    }

    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        match self.kind {
            TopologyKind::FullyConnected => q1 != q2,
            _ => self.edges.binary_search(&ordered(q1, q2)).is_ok(),
        }
    }

    /// Coupled pairs among `qubits`, lower index first.
    pub fn coupled_pairs(&self, qubits: &[u32]) -> Vec<(u32, u32)> {
        match self.kind {
            TopologyKind::FullyConnected => qubits
                .iter()
                .enumerate()
                .flat_map(|(i, &a)| qubits[i + 1..].iter().map(move |&b| ordered(a, b)))
                .collect(),
            _ => self.edges.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopologyKind {
    FullyConnected,
    Grid { rows: u32, cols: u32 },
    /// From an instruction set architecture.
    Custom,
}

/// Device-wide noise averages.
///
/// Fidelities are in `[0.0, 1.0]`. T1 and T2 are in **microseconds**.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_qubit_fidelity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two_qubit_fidelity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readout_fidelity: Option<f64>,
}

impl NoiseProfile {
    /// The generic QVM noise model: T1/T2 decay plus readout error.
    pub fn generic_qvm() -> Self {
        Self {
            t1: Some(30.0),
            t2: Some(30.0),
            single_qubit_fidelity: None,
            two_qubit_fidelity: None,
            readout_fidelity: Some(0.95),
        }
    }

    /// Averages of the `fRB`, `fCZ`, `fRO`, `T1` and `T2` characteristics
    /// found anywhere in the ISA. `None` if none are present.
    ///
    /// T1 and T2 are reported in seconds by QCS and converted here.
    pub fn from_isa(isa: &InstructionSetArchitecture) -> Option<Self> {
        let characteristics: Vec<_> = isa
            .instructions
            .iter()
            .chain(isa.benchmarks.iter())
            .flat_map(|op| op.all_characteristics())
            .collect();

        let average = |name: &str| -> Option<f64> {
            let values: Vec<f64> = characteristics
                .iter()
                .filter(|c| c.name == name)
                .map(|c| c.value)
                .collect();
            if values.is_empty() {
                None
            } else {
                #[allow(clippy::cast_precision_loss)]
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        };

        let profile = Self {
            t1: average("T1").map(|s| s * 1e6),
            t2: average("T2").map(|s| s * 1e6),
            single_qubit_fidelity: average("fRB"),
            two_qubit_fidelity: average("fCZ"),
            readout_fidelity: average("fRO"),
        };
        (profile != Self::default()).then_some(profile)
    }
}
