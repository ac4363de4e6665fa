use dial_core::{
    Combination, Constraints, DIAGNOSTIC_METRICS, Emulator, Encoding, FloatType, MetricsRecord,
    Mode, ParameterRange,
};
use dial_search::{
    Relation,
    bisection::{self, Action, Event},
    relation,
};
use ndarray::ArrayViewD;

use crate::{AnalyzeError, ObjectiveFunction, RelationPolicy, metrics::MetricRegistry};

/// Threshold attached to diagnostic metrics when reporting them for a
/// compression-ratio target.
const DIAGNOSTIC_THRESHOLD: f64 = 1.0;

/// Resolved settings shared by every variable in an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub search: bisection::Config,
    pub relation: RelationPolicy,
    /// Fail instead of returning a parameter that misses the constraints.
    pub strict: bool,
    /// Dimension whose last step alone is analyzed.
    pub time_dimension: String,
    /// Variables with fewer elements are stored losslessly.
    pub min_size: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            search: bisection::Config::default(),
            relation: RelationPolicy::default(),
            strict: false,
            time_dimension: "time".to_string(),
            min_size: 10_000,
        }
    }
}

/// Returns the parameter range searched for `mode` on `data`.
///
/// Absolute bounds run from the data's value range down to zero, relative
/// bounds from one down to zero, rates from 1 to 32 bits per value, and
/// precision from 2 to 32 bits.
///
/// # Errors
///
/// Returns [`AnalyzeError::UnsupportedMode`] for modes without a range.
pub fn parameter_range(mode: Mode, data: ArrayViewD<'_, f64>) -> Result<ParameterRange, AnalyzeError> {
    let range = match mode {
        Mode::Abs | Mode::Accuracy => {
            let (min, max) = data
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            let spread = max - min;
            // Constant fields reconstruct exactly under any bound.
            let looser = if spread.is_finite() && spread > 0.0 { spread } else { 1.0 };
            ParameterRange::continuous(looser, 0.0)?
        }
        Mode::Rel | Mode::PwRel => ParameterRange::continuous(1.0, 0.0)?,
        Mode::Rate => ParameterRange::continuous(1.0, 32.0)?,
        Mode::Precision => ParameterRange::discrete(2, 32)?,
        Mode::Norm2 | Mode::Psnr => return Err(AnalyzeError::UnsupportedMode { mode }),
    };
    Ok(range)
}

/// Finds the best parameter for one variable and one combination.
pub struct VariableAnalyzer<'a, E: ?Sized> {
    emulator: &'a E,
    metrics: &'a MetricRegistry,
    constraints: &'a Constraints,
    settings: &'a AnalysisSettings,
}

impl<'a, E: Emulator + ?Sized> VariableAnalyzer<'a, E> {
    pub fn new(
        emulator: &'a E,
        metrics: &'a MetricRegistry,
        constraints: &'a Constraints,
        settings: &'a AnalysisSettings,
    ) -> Self {
        Self {
            emulator,
            metrics,
            constraints,
            settings,
        }
    }

    /// Searches for the loosest parameter of `combination` that meets the
    /// constraints on `data`, stored as `float_type`, and returns its
    /// encoding and metrics.
    ///
    /// Data containing NaN is stored losslessly with zeroed diagnostics.
    /// For compression-ratio targets the reported metrics also include the
    /// diagnostic metrics, measured at the selected parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode has no range, emulation or a metric
    /// fails, or strict analysis cannot meet the constraints.
    pub fn analyze(
        &self,
        name: &str,
        data: ArrayViewD<'_, f64>,
        float_type: FloatType,
        combination: Combination,
    ) -> Result<(Encoding, MetricsRecord), AnalyzeError> {
        if data.iter().any(|v| v.is_nan()) {
            log::warn!("{name} contains missing values and will be stored losslessly");
            return Ok((Encoding::Lossless, MetricsRecord::lossless_with_diagnostics()));
        }

        let range = parameter_range(combination.mode, data.view())?;
        let objective = ObjectiveFunction::new(
            data.view(),
            float_type,
            combination,
            self.constraints,
            self.emulator,
            self.metrics,
        );

        let relation = match self.settings.relation {
            RelationPolicy::Probe => relation::probe(&objective, &range)?,
            RelationPolicy::Direct => Relation::Direct,
            RelationPolicy::Inverse => Relation::Inverse,
        };

        let solution = bisection::solve(
            &objective,
            range,
            relation,
            &self.settings.search,
            |event: &Event| -> Option<Action> {
                log::trace!(
                    "{name} {combination}: step {} at {} has margin {:.4}",
                    event.iter,
                    event.parameter,
                    event.margin
                );
                None
            },
        )?;

        log::debug!(
            "{name} {combination}: {} after {} evaluations ({:?})",
            solution.parameter,
            objective.evaluations(),
            solution.status
        );

        if self.settings.strict {
            let margin = match solution.margin {
                Some(margin) => margin,
                None => objective.margin(solution.parameter)?,
            };
            if margin < 0.0 {
                return Err(AnalyzeError::ConditionsNotFulfilled {
                    variable: name.to_string(),
                    combination,
                    margin,
                });
            }
        }

        let metrics = if self.constraints.targets_compression_ratio() {
            let report = self
                .constraints
                .with_diagnostics(&DIAGNOSTIC_METRICS, DIAGNOSTIC_THRESHOLD);
            ObjectiveFunction::new(
                data.view(),
                float_type,
                combination,
                &report,
                self.emulator,
                self.metrics,
            )
            .evaluate_metrics(solution.parameter)?
        } else {
            objective.evaluate_metrics(solution.parameter)?
        };

        Ok((Encoding::lossy(combination, solution.parameter), metrics))
    }
}
