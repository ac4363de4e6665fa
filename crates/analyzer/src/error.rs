use dial_core::{Combination, EmulationError, Mode, RangeError};
use thiserror::Error;

use crate::{dataset::DatasetError, metrics::MetricError, options::OptionsError};

/// Errors that can occur while analyzing a dataset.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Emulation(#[from] EmulationError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("invalid parameter range")]
    InvalidRange(#[from] RangeError),

    /// The mode has no known parameter range to search.
    #[error("no parameter range is defined for mode {mode}")]
    UnsupportedMode { mode: Mode },

    #[error("no constraints to evaluate")]
    NoConstraints,

    /// Strict analysis found no parameter meeting every constraint.
    #[error("{variable} cannot meet the constraints with {combination}")]
    ConditionsNotFulfilled {
        variable: String,
        combination: Combination,
        margin: f64,
    },

    #[error("none of the requested compressor and mode combinations is available")]
    NoAvailableCombination,
}

impl AnalyzeError {
    /// Returns `true` if the error means a backend is missing, so the
    /// combination should be skipped rather than aborting the analysis.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Emulation(EmulationError::Unavailable { .. }))
    }
}
