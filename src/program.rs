//! Quil programs.
//!
//! A [`Program`] is the unit handed to compilers and quantum abstract
//! machines: classical memory declarations followed by instructions. Only
//! `DECLARE` lines are interpreted when parsing Quil text; every other line
//! is kept verbatim, which is all the executors need to patch memory into a
//! compiled program.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{QcsError, QcsResult};

/// Values written into `REAL` memory regions before execution.
pub type MemoryMap = FxHashMap<String, Vec<f64>>;

/// Quil classical memory types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryType {
    Bit,
    Octet,
    Integer,
    Real,
}

impl MemoryType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "BIT" => Some(Self::Bit),
            "OCTET" => Some(Self::Octet),
            "INTEGER" => Some(Self::Integer),
            "REAL" => Some(Self::Real),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryType::Bit => write!(f, "BIT"),
            MemoryType::Octet => write!(f, "OCTET"),
            MemoryType::Integer => write!(f, "INTEGER"),
            MemoryType::Real => write!(f, "REAL"),
        }
    }
}

/// A `DECLARE` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub memory_type: MemoryType,
    pub size: usize,
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DECLARE {} {}[{}]", self.name, self.memory_type, self.size)
    }
}

/// A gate parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Number(f64),
    MemoryRef { name: String, index: usize },
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(v) => write!(f, "{v:?}"),
            Expression::MemoryRef { name, index } => write!(f, "{name}[{index}]"),
        }
    }
}

/// A Quil instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Gate {
        name: String,
        params: Vec<Expression>,
        qubits: Vec<u32>,
    },
    Measure {
        qubit: u32,
        region: String,
        index: usize,
    },
    Reset,
    Move {
        region: String,
        index: usize,
        value: f64,
    },
    Pragma(String),
    /// A line kept verbatim (compiler output).
    Raw(String),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Gate {
                name,
                params,
                qubits,
            } => {
                write!(f, "{name}")?;
                if !params.is_empty() {
                    let params: Vec<String> = params.iter().map(ToString::to_string).collect();
                    write!(f, "({})", params.join(", "))?;
                }
                for q in qubits {
                    write!(f, " {q}")?;
                }
                Ok(())
            }
            Instruction::Measure {
                qubit,
                region,
                index,
            } => write!(f, "MEASURE {qubit} {region}[{index}]"),
            Instruction::Reset => write!(f, "RESET"),
            Instruction::Move {
                region,
                index,
                value,
            } => write!(f, "MOVE {region}[{index}] {value:?}"),
            Instruction::Pragma(body) => write!(f, "PRAGMA {body}"),
            Instruction::Raw(line) => write!(f, "{line}"),
        }
    }
}

/// A Quil program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    declarations: Vec<Declaration>,
    instructions: Vec<Instruction>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse Quil text.
    ///
    /// `DECLARE` lines become declarations; blank lines and `#` comments are
    /// dropped; everything else is kept as [`Instruction::Raw`].
    pub fn from_quil(quil: &str) -> QcsResult<Self> {
        let mut program = Self::new();
        for line in quil.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("DECLARE ") {
                program.declare_parsed(rest)?;
            } else {
                // Indentation marks DEFGATE/DEFCIRCUIT/DEFCAL bodies.
                program.push(Instruction::Raw(line.trim_end().to_string()));
            }
        }
        Ok(program)
    }

    fn declare_parsed(&mut self, rest: &str) -> QcsResult<()> {
        let invalid = || QcsError::InvalidProgram(format!("malformed declaration: DECLARE {rest}"));
        let mut parts = rest.split_whitespace();
        let name = parts.next().ok_or_else(invalid)?;
        let ty = parts.next().ok_or_else(invalid)?;
        let (type_name, size) = match ty.split_once('[') {
            Some((t, n)) => {
                let size = n
                    .strip_suffix(']')
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(invalid)?;
                (t, size)
            }
            None => (ty, 1),
        };
        let memory_type = MemoryType::parse(type_name).ok_or_else(invalid)?;
        self.declare(name, memory_type, size)
    }

    /// Declare a memory region. Redeclaring a name is an error.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        memory_type: MemoryType,
        size: usize,
    ) -> QcsResult<()> {
        let name = name.into();
        if self.declaration(&name).is_some() {
            return Err(QcsError::InvalidProgram(format!(
                "memory region {name} declared twice"
            )));
        }
        if size == 0 {
            return Err(QcsError::InvalidProgram(format!(
                "memory region {name} has zero size"
            )));
        }
        self.declarations.push(Declaration {
            name,
            memory_type,
            size,
        });
        Ok(())
    }

    /// Append an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Look up a declaration by name.
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Names of regions that hold readout (`BIT` or `OCTET`).
    pub fn readout_regions(&self) -> Vec<&str> {
        self.declarations
            .iter()
            .filter(|d| matches!(d.memory_type, MemoryType::Bit | MemoryType::Octet))
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Return a copy with `MOVE` instructions writing `memory` into its
    /// `REAL` regions, placed ahead of all other instructions.
    pub fn with_memory(&self, memory: &MemoryMap) -> QcsResult<Program> {
        let mut moves = Vec::new();
        let mut regions: Vec<_> = memory.iter().collect();
        regions.sort_by(|a, b| a.0.cmp(b.0));

        for (region, values) in regions {
            let decl = self.declaration(region).ok_or_else(|| {
                QcsError::InvalidProgram(format!("memory region {region} is not declared"))
            })?;
            if decl.memory_type != MemoryType::Real {
                return Err(QcsError::InvalidProgram(format!(
                    "memory region {region} is {}, expected REAL",
                    decl.memory_type
                )));
            }
            if values.len() > decl.size {
                return Err(QcsError::InvalidProgram(format!(
                    "{} value(s) do not fit in {decl}",
                    values.len()
                )));
            }
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(QcsError::InvalidProgram(format!(
                    "{region}[{index}] is {}, not a finite number",
                    values[index]
                )));
            }
            moves.extend(values.iter().enumerate().map(|(index, &value)| Instruction::Move {
                region: region.clone(),
                index,
                value,
            }));
        }

        moves.extend(self.instructions.iter().cloned());
        Ok(Program {
            declarations: self.declarations.clone(),
            instructions: moves,
        })
    }

    /// Render as Quil text.
    pub fn to_quil(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.declarations {
            writeln!(f, "{decl}")?;
        }
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bell() -> Program {
        let mut p = Program::new();
        p.declare("m0", MemoryType::Bit, 2).unwrap();
        p.push(Instruction::Gate {
            name: "H".into(),
            params: vec![],
            qubits: vec![0],
        });
        p.push(Instruction::Gate {
            name: "CNOT".into(),
            params: vec![],
            qubits: vec![0, 1],
        });
        p.push(Instruction::Measure {
            qubit: 0,
            region: "m0".into(),
            index: 0,
        });
        p.push(Instruction::Measure {
            qubit: 1,
            region: "m0".into(),
            index: 1,
        });
        p
    }

    #[test]
    fn test_to_quil() {
        assert_eq!(
            bell().to_quil(),
            "DECLARE m0 BIT[2]\nH 0\nCNOT 0 1\nMEASURE 0 m0[0]\nMEASURE 1 m0[1]\n"
        );
    }

    #[test]
    fn test_gate_params_render_as_floats() {
        let gate = Instruction::Gate {
            name: "RX".into(),
            params: vec![
                Expression::Number(1.0),
                Expression::MemoryRef {
                    name: "theta".into(),
                    index: 0,
                },
            ],
            qubits: vec![3],
        };
        assert_eq!(gate.to_string(), "RX(1.0, theta[0]) 3");
    }

    #[test]
    fn test_from_quil_keeps_instructions() {
        let text = "# compiled\nDECLARE ro BIT[2]\nDECLARE theta REAL\n\nRZ(theta[0]) 0\nMEASURE 0 ro[0]\n";
        let program = Program::from_quil(text).unwrap();
        assert_eq!(program.declarations().len(), 2);
        assert_eq!(program.declaration("theta").unwrap().size, 1);
        assert_eq!(program.readout_regions(), vec!["ro"]);
        assert_eq!(
            program.instructions(),
            &[
                Instruction::Raw("RZ(theta[0]) 0".into()),
                Instruction::Raw("MEASURE 0 ro[0]".into()),
            ]
        );
    }

    #[test]
    fn test_from_quil_keeps_indented_bodies() {
        let text = "DEFGATE FOO:\n    1, 0\n    0, 1\nFOO 0\n";
        assert_eq!(Program::from_quil(text).unwrap().to_quil(), text);

        let calibration = "DEFCAL RX(pi/2) 0:\n    NOP  \n";
        assert_eq!(
            Program::from_quil(calibration).unwrap().instructions()[1],
            Instruction::Raw("    NOP".into())
        );
    }

    #[test]
    fn test_move_rejects_non_finite_values() {
        let mut p = Program::new();
        p.declare("theta", MemoryType::Real, 2).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut memory = MemoryMap::default();
            memory.insert("theta".into(), vec![0.5, bad]);
            assert!(matches!(
                p.with_memory(&memory),
                Err(QcsError::InvalidProgram(msg)) if msg.contains("theta[1]")
            ));
        }
    }

    #[test]
    fn test_from_quil_rejects_bad_declaration() {
        assert!(Program::from_quil("DECLARE ro QUBIT[2]").is_err());
        assert!(Program::from_quil("DECLARE ro BIT[x]").is_err());
        assert!(Program::from_quil("DECLARE ro BIT[2]\nDECLARE ro BIT[1]").is_err());
    }

    #[test]
    fn test_with_memory() {
        let mut p = Program::new();
        p.declare("theta", MemoryType::Real, 1).unwrap();
        p.declare("ro", MemoryType::Bit, 1).unwrap();
        p.push(Instruction::Raw("RX(theta[0]) 0".into()));

        let mut memory = MemoryMap::default();
        memory.insert("theta".into(), vec![0.5]);
        let patched = p.with_memory(&memory).unwrap();
        assert_eq!(
            patched.to_quil(),
            "DECLARE theta REAL[1]\nDECLARE ro BIT[1]\nMOVE theta[0] 0.5\nRX(theta[0]) 0\n"
        );

        memory.insert("ro".into(), vec![1.0]);
        assert!(p.with_memory(&memory).is_err());

        let mut too_many = MemoryMap::default();
        too_many.insert("theta".into(), vec![0.1, 0.2]);
        assert!(p.with_memory(&too_many).is_err());

        let mut undeclared = MemoryMap::default();
        undeclared.insert("phi".into(), vec![0.1]);
        assert!(p.with_memory(&undeclared).is_err());
    }
}
