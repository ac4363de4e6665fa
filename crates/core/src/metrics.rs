use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::COMPRESSION_RATIO;

/// Diagnostic metrics reported alongside compression-ratio targets.
pub const DIAGNOSTIC_METRICS: [&str; 2] = ["correlation_I", "ssim_I"];

/// Metric values measured for one variable at one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsRecord(BTreeMap<String, f64>);

impl MetricsRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The record of a variable stored without loss.
    #[must_use]
    pub fn lossless() -> Self {
        let mut record = Self::new();
        record.insert(COMPRESSION_RATIO, 1.0);
        record
    }

    /// A lossless record that also zero-fills the diagnostic metrics.
    ///
    /// Used when metrics cannot be measured, such as for data containing
    /// missing values.
    #[must_use]
    pub fn lossless_with_diagnostics() -> Self {
        let mut record = Self::lossless();
        for name in DIAGNOSTIC_METRICS {
            record.insert(name, 0.0);
        }
        record
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Returns the compression ratio, if recorded.
    #[must_use]
    pub fn compression_ratio(&self) -> Option<f64> {
        self.get(COMPRESSION_RATIO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(n, v)| (n.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for MetricsRecord {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }
}
