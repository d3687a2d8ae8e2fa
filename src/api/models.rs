//! QCS API response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A quantum processor known to QCS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantumProcessor {
    /// Processor identifier (e.g. `Ankaa-3`).
    pub id: String,
}

/// One page of `GET /v1/quantumProcessors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuantumProcessorsResponse {
    pub quantum_processors: Vec<QuantumProcessor>,
    /// Opaque token for the next page. Empty or absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl ListQuantumProcessorsResponse {
    /// The next page token, treating an empty token as absent.
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Calibration program used for client-side Quil-T generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetQuiltCalibrationsResponse {
    /// Quil-T calibration definitions.
    pub quilt: String,
    /// When the underlying settings were last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_timestamp: Option<DateTime<Utc>>,
}

/// A measured characteristic of an operation site or benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Characteristic {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ids: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_values: Option<Vec<f64>>,
    pub timestamp: DateTime<Utc>,
}

/// Operation parameter name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
}

/// A set of nodes on which an operation is available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSite {
    pub node_ids: Vec<u32>,
    #[serde(default)]
    pub characteristics: Vec<Characteristic>,
}

/// A native operation or benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u32>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub sites: Vec<OperationSite>,
    #[serde(default)]
    pub characteristics: Vec<Characteristic>,
}

impl Operation {
    /// All characteristics of this operation, its sites included.
    pub fn all_characteristics(&self) -> impl Iterator<Item = &Characteristic> {
        self.characteristics
            .iter()
            .chain(self.sites.iter().flat_map(|s| s.characteristics.iter()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub node_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub node_ids: Vec<u32>,
}

/// Processor connectivity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Architecture {
    /// Lattice family (e.g. `Aspen`, `Ankaa`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Instruction set architecture of a quantum processor: connectivity,
/// native operations, and benchmark results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionSetArchitecture {
    pub name: String,
    pub architecture: Architecture,
    #[serde(default)]
    pub instructions: Vec<Operation>,
    #[serde(default)]
    pub benchmarks: Vec<Operation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_pagination_token() {
        let page: ListQuantumProcessorsResponse = serde_json::from_str(
            r#"{"quantumProcessors":[{"id":"Ankaa-3"}],"nextPageToken":""}"#,
        )
        .unwrap();
        assert_eq!(page.quantum_processors[0].id, "Ankaa-3");
        assert_eq!(page.next_page(), None);

        let page: ListQuantumProcessorsResponse = serde_json::from_str(
            r#"{"quantumProcessors":[],"nextPageToken":"abc"}"#,
        )
        .unwrap();
        assert_eq!(page.next_page(), Some("abc"));
    }

    #[test]
    fn test_isa_deserialize() {
        let isa: InstructionSetArchitecture = serde_json::from_str(
            r#"{
                "name": "Ankaa-3",
                "architecture": {
                    "family": "Ankaa",
                    "nodes": [{"node_id": 0}, {"node_id": 1}],
                    "edges": [{"node_ids": [0, 1]}]
                },
                "instructions": [{
                    "name": "RX",
                    "node_count": 1,
                    "parameters": [{"name": "theta"}],
                    "sites": [{
                        "node_ids": [0],
                        "characteristics": [{
                            "name": "fRB",
                            "value": 0.998,
                            "error": 0.001,
                            "node_ids": [0],
                            "timestamp": "2024-01-01T00:00:00Z"
                        }]
                    }],
                    "characteristics": []
                }],
                "benchmarks": []
            }"#,
        )
        .unwrap();
        assert_eq!(isa.architecture.nodes.len(), 2);
        assert_eq!(isa.instructions[0].all_characteristics().count(), 1);
    }

    #[test]
    fn test_calibrations_deserialize() {
        let cal: GetQuiltCalibrationsResponse = serde_json::from_str(
            r#"{"quilt":"DEFCAL RX(pi/2) 0:\n    NOP\n","settingsTimestamp":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(cal.quilt.starts_with("DEFCAL"));
        assert!(cal.settings_timestamp.is_some());
    }
}
