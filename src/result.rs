//! Execution result types.
//!
//! [`ExecutionData`] is what a quantum abstract machine returns: raw readout
//! per memory region. [`RunResult`] is what callers get back: measurements
//! per circuit key together with the parameters they were taken with.
//!
//! Bitstring ordering in [`RunResult::histogram`] follows measurement order:
//! the leftmost bit is the first qubit listed in the measurement.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{QcsError, QcsResult};
use crate::resolver::ParamResolver;
use crate::transformer::MeasurementRegister;

/// Bitstring histogram for one measurement key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts(FxHashMap<String, u64>);

impl Counts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(bitstring, count)` pairs; repeated bitstrings add up.
    pub fn from_pairs(iter: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        let mut counts = Self::new();
        iter.into_iter()
            .for_each(|(bitstring, n)| counts.insert(bitstring, n));
        counts
    }

    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.0.entry(bitstring.into()).or_default() += count;
    }

    /// Occurrences of `bitstring`; zero if never seen.
    pub fn get(&self, bitstring: &str) -> u64 {
        self.0.get(bitstring).map_or(0, |n| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }

    pub fn total_shots(&self) -> u64 {
        self.0.values().sum()
    }

    /// The most common bitstring; ties go to the smallest bitstring.
    pub fn most_frequent(&self) -> Option<(&String, &u64)> {
        self.sorted().into_iter().next()
    }

    /// Relative frequency of each bitstring.
    #[allow(clippy::cast_precision_loss)]
    pub fn probabilities(&self) -> FxHashMap<String, f64> {
        let total = self.total_shots();
        if total == 0 {
            return FxHashMap::default();
        }
        self.0
            .iter()
            .map(|(bitstring, &n)| (bitstring.clone(), n as f64 / total as f64))
            .collect()
    }

    /// Most common first, ties broken by bitstring.
    pub fn sorted(&self) -> Vec<(&String, &u64)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|(a, n), (b, m)| m.cmp(n).then_with(|| a.cmp(b)));
        entries
    }

    /// Number of distinct bitstrings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for Counts {
    fn from_iter<I: IntoIterator<Item = String>>(shots: I) -> Self {
        Self::from_pairs(shots.into_iter().map(|bitstring| (bitstring, 1)))
    }
}

/// Raw readout from one program execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionData {
    /// Memory region → one row per shot.
    pub readout: FxHashMap<String, Vec<Vec<i64>>>,
    /// Execution time in milliseconds, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl ExecutionData {
    pub fn new(readout: FxHashMap<String, Vec<Vec<i64>>>) -> Self {
        Self {
            readout,
            execution_time_ms: None,
        }
    }

    pub fn with_execution_time(mut self, time_ms: u64) -> Self {
        self.execution_time_ms = Some(time_ms);
        self
    }
}

/// Measurements of one circuit run under one set of parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Parameters the circuit was resolved with.
    pub params: ParamResolver,
    /// Number of repetitions.
    pub repetitions: u32,
    measurements: BTreeMap<String, Vec<Vec<u8>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    execution_time_ms: Option<u64>,
}

impl RunResult {
    /// Extract per-key measurements from raw readout.
    ///
    /// Every register must be present, hold at least `repetitions` rows, and
    /// each row must be at least as wide as the register. Extra rows and
    /// columns are ignored. Any nonzero value reads as `1`.
    pub fn from_execution_data(
        params: ParamResolver,
        registers: &[MeasurementRegister],
        data: &ExecutionData,
        repetitions: u32,
    ) -> QcsResult<Self> {
        let mut measurements = BTreeMap::new();
        for register in registers {
            let rows = data.readout.get(&register.region).ok_or_else(|| {
                QcsError::JobFailed(format!(
                    "readout region {} for key {} missing from results",
                    register.region, register.key
                ))
            })?;
            if rows.len() < repetitions as usize {
                return Err(QcsError::JobFailed(format!(
                    "region {} returned {} shot(s), expected {repetitions}",
                    register.region,
                    rows.len()
                )));
            }
            let bits = rows
                .iter()
                .take(repetitions as usize)
                .map(|row| {
                    if row.len() < register.width {
                        return Err(QcsError::JobFailed(format!(
                            "region {} row has {} value(s), expected {}",
                            register.region,
                            row.len(),
                            register.width
                        )));
                    }
                    Ok(row[..register.width].iter().map(|&v| u8::from(v != 0)).collect())
                })
                .collect::<QcsResult<Vec<Vec<u8>>>>()?;
            measurements.insert(register.key.clone(), bits);
        }

        Ok(Self {
            params,
            repetitions,
            measurements,
            execution_time_ms: data.execution_time_ms,
        })
    }

    /// Per-shot bits for a measurement key.
    pub fn measurement(&self, key: &str) -> Option<&[Vec<u8>]> {
        self.measurements.get(key).map(Vec::as_slice)
    }

    /// All measurement keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.measurements.keys().map(String::as_str)
    }

    /// Histogram of bitstrings for a measurement key.
    pub fn histogram(&self, key: &str) -> Option<Counts> {
        self.measurements.get(key).map(|shots| {
            shots
                .iter()
                .map(|shot| {
                    shot.iter()
                        .map(|&b| if b == 0 { '0' } else { '1' })
                        .collect::<String>()
                })
                .collect()
        })
    }

    pub fn execution_time_ms(&self) -> Option<u64> {
        self.execution_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(key: &str, region: &str, width: usize) -> MeasurementRegister {
        MeasurementRegister {
            key: key.into(),
            region: region.into(),
            width,
        }
    }

    fn readout(region: &str, rows: Vec<Vec<i64>>) -> ExecutionData {
        let mut map = FxHashMap::default();
        map.insert(region.to_string(), rows);
        ExecutionData::new(map)
    }

    #[test]
    fn test_counts_accumulate() {
        let mut counts = Counts::from_pairs([("000", 250), ("111", 200)]);
        counts.insert("111", 50);

        assert_eq!(counts.get("111"), 250);
        assert_eq!(counts.get("010"), 0);
        assert_eq!(counts.total_shots(), 500);
        assert_eq!(counts.len(), 2);
        assert!((counts.probabilities()["000"] - 0.5).abs() < 1e-10);
        assert!(Counts::new().probabilities().is_empty());
    }

    #[test]
    fn test_counts_from_shots() {
        let counts: Counts = ["01", "01", "10"].into_iter().map(String::from).collect();
        assert_eq!(counts.get("01"), 2);
        assert_eq!(counts.total_shots(), 3);
    }

    #[test]
    fn test_counts_sorted() {
        let counts = Counts::from_pairs([("01", 5), ("00", 10), ("11", 5)]);
        let sorted: Vec<_> = counts.sorted().into_iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(sorted, vec!["00", "01", "11"]);
        assert_eq!(counts.most_frequent().unwrap().0, "00");

        let tied = Counts::from_pairs([("11", 4), ("10", 4)]);
        assert_eq!(tied.most_frequent().unwrap().0, "10");
    }

    #[test]
    fn test_run_result_from_execution_data() {
        let data = readout("m0", vec![vec![0, 0], vec![1, 1], vec![1, 1], vec![1, 0]])
            .with_execution_time(7);
        let result = RunResult::from_execution_data(
            ParamResolver::new(),
            &[register("z", "m0", 2)],
            &data,
            3,
        )
        .unwrap();

        assert_eq!(result.measurement("z").unwrap().len(), 3);
        let hist = result.histogram("z").unwrap();
        assert_eq!(hist.get("00"), 1);
        assert_eq!(hist.get("11"), 2);
        assert_eq!(hist.get("10"), 0);
        assert_eq!(result.execution_time_ms(), Some(7));
        assert!(result.histogram("missing").is_none());
    }

    #[test]
    fn test_run_result_missing_region() {
        let data = readout("ro", vec![vec![0]]);
        let err = RunResult::from_execution_data(
            ParamResolver::new(),
            &[register("z", "m0", 1)],
            &data,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, QcsError::JobFailed(_)));
    }

    #[test]
    fn test_run_result_short_rows() {
        let data = readout("m0", vec![vec![1]]);
        assert!(
            RunResult::from_execution_data(
                ParamResolver::new(),
                &[register("z", "m0", 2)],
                &data,
                1,
            )
            .is_err()
        );
        assert!(
            RunResult::from_execution_data(
                ParamResolver::new(),
                &[register("z", "m0", 1)],
                &data,
                2,
            )
            .is_err()
        );
    }
}
