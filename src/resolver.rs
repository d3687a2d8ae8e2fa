//! Parameter resolution and sweeps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::circuit::Param;
use crate::error::{QcsError, QcsResult};

/// Maps symbol names to concrete values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamResolver {
    values: BTreeMap<String, f64>,
}

impl ParamResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver from (symbol, value) pairs.
    pub fn from_pairs(iter: impl IntoIterator<Item = (impl Into<String>, f64)>) -> Self {
        let mut resolver = Self::new();
        for (k, v) in iter {
            resolver.set(k, v);
        }
        resolver
    }

    /// Set the value of a symbol.
    pub fn set(&mut self, symbol: impl Into<String>, value: f64) {
        self.values.insert(symbol.into(), value);
    }

    /// The value of `symbol`, if present.
    pub fn value_of(&self, symbol: &str) -> Option<f64> {
        self.values.get(symbol).copied()
    }

    /// Resolve a parameter to a concrete, finite value.
    pub fn resolve(&self, param: &Param) -> QcsResult<f64> {
        let value = match param {
            Param::Value(v) => *v,
            Param::Symbol(s) => self
                .value_of(s)
                .ok_or_else(|| QcsError::UnresolvedParameter(s.clone()))?,
        };
        if !value.is_finite() {
            return Err(QcsError::InvalidCircuit(format!(
                "parameter {param:?} resolves to {value}"
            )));
        }
        Ok(value)
    }

    /// Iterate over (symbol, value) pairs in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for ParamResolver {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// A sweep of `length` evenly spaced values of `symbol` from `start` to `stop`
/// inclusive.
pub fn linspace(symbol: &str, start: f64, stop: f64, length: usize) -> Vec<ParamResolver> {
    match length {
        0 => vec![],
        1 => vec![ParamResolver::from_pairs([(symbol, start)])],
        n => {
            #[allow(clippy::cast_precision_loss)]
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    #[allow(clippy::cast_precision_loss)]
                    let value = start + step * i as f64;
                    ParamResolver::from_pairs([(symbol, value)])
                })
                .collect()
        }
    }
}
