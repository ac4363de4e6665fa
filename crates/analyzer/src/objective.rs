use std::cell::Cell;

use dial_core::{
    COMPRESSION_RATIO, Combination, Constraints, Emulator, FloatType, MetricsRecord, Objective,
    Parameter,
};
use ndarray::ArrayViewD;

use crate::{AnalyzeError, metrics::MetricRegistry};

/// Scores a compression parameter against a set of constraints.
///
/// Each evaluation round-trips the reference data through the emulator at
/// its stored element type, measures the constrained metrics, and records the compression ratio.
/// Evaluations are counted so callers can report search cost.
pub struct ObjectiveFunction<'a, E: ?Sized> {
    reference: ArrayViewD<'a, f64>,
    float_type: FloatType,
    combination: Combination,
    constraints: &'a Constraints,
    emulator: &'a E,
    metrics: &'a MetricRegistry,
    evaluations: Cell<usize>,
}

impl<'a, E: Emulator + ?Sized> ObjectiveFunction<'a, E> {
    pub fn new(
        reference: ArrayViewD<'a, f64>,
        float_type: FloatType,
        combination: Combination,
        constraints: &'a Constraints,
        emulator: &'a E,
        metrics: &'a MetricRegistry,
    ) -> Self {
        Self {
            reference,
            float_type,
            combination,
            constraints,
            emulator,
            metrics,
            evaluations: Cell::new(0),
        }
    }

    /// Measures every constrained metric, plus the compression ratio.
    ///
    /// # Errors
    ///
    /// Returns an error if emulation or a metric fails.
    pub fn evaluate_metrics(&self, parameter: Parameter) -> Result<MetricsRecord, AnalyzeError> {
        self.evaluations.set(self.evaluations.get() + 1);

        let emulation = self.emulator.compress_and_decompress(
            self.reference.view(),
            self.float_type,
            self.combination,
            parameter,
        )?;

        let mut record = self.metrics.compute(
            self.reference.view(),
            emulation.reconstructed.view(),
            self.constraints.metric_names(),
        )?;
        record.insert(COMPRESSION_RATIO, emulation.compression_ratio);

        Ok(record)
    }

    /// Returns the smallest `metric - threshold` across the constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails or there are no constraints.
    pub fn margin(&self, parameter: Parameter) -> Result<f64, AnalyzeError> {
        let record = self.evaluate_metrics(parameter)?;
        self.constraints
            .margin(&record)
            .ok_or(AnalyzeError::NoConstraints)
    }

    /// Returns `true` if every constraint is met at `parameter`.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails or there are no constraints.
    pub fn satisfied(&self, parameter: Parameter) -> Result<bool, AnalyzeError> {
        Ok(self.margin(parameter)? >= 0.0)
    }

    /// Returns the number of emulator round trips so far.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    #[must_use]
    pub fn combination(&self) -> Combination {
        self.combination
    }
}

impl<E: Emulator + ?Sized> Objective for ObjectiveFunction<'_, E> {
    type Error = AnalyzeError;

    fn margin(&self, parameter: Parameter) -> Result<f64, AnalyzeError> {
        ObjectiveFunction::margin(self, parameter)
    }
}
