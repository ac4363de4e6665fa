use std::collections::{BTreeMap, BTreeSet};

use dial_core::{Combination, Constraints, Emulator, Encoding, FloatType, MetricsRecord};

use crate::{
    AnalysisSettings, AnalyzeError, VariableAnalyzer,
    dataset::{Dataset, Variable},
    metrics::MetricRegistry,
};

/// Per-combination encodings and metrics for every variable of a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisResults {
    /// Combinations that could be analyzed, in enumeration order.
    pub combinations: Vec<Combination>,

    /// Variable names, in dataset order.
    pub variables: Vec<String>,

    pub encodings: BTreeMap<Combination, BTreeMap<String, Encoding>>,
    pub metrics: BTreeMap<Combination, BTreeMap<String, MetricsRecord>>,
}

impl AnalysisResults {
    /// Returns the encoding and metrics of one variable under one combination.
    #[must_use]
    pub fn get(&self, combination: Combination, variable: &str) -> Option<(&Encoding, &MetricsRecord)> {
        let encoding = self.encodings.get(&combination)?.get(variable)?;
        let metrics = self.metrics.get(&combination)?.get(variable)?;
        Some((encoding, metrics))
    }
}

/// Why a variable skips the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bypass {
    Coordinate,
    TooSmall,
    NotFloat,
}

/// Outcome of one (combination, variable) unit of work.
enum Outcome {
    Analyzed(Encoding, MetricsRecord),
    Unavailable,
}

/// Runs the per-variable search for every combination over a dataset.
///
/// Coordinates, variables smaller than the minimum size, and non-float
/// variables are stored losslessly without searching. A combination whose
/// backend is unavailable is dropped from the results. With the `parallel`
/// feature, units of work run on the rayon thread pool; results are
/// assembled in the same order either way.
#[derive(Debug)]
pub struct DatasetAnalyzer<E> {
    emulator: E,
    metrics: MetricRegistry,
    constraints: Constraints,
    settings: AnalysisSettings,
}

impl<E: Emulator + Sync> DatasetAnalyzer<E> {
    pub fn new(emulator: E, constraints: Constraints, settings: AnalysisSettings) -> Self {
        Self {
            emulator,
            metrics: MetricRegistry::default(),
            constraints,
            settings,
        }
    }

    /// Replaces the metric registry.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricRegistry) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    #[must_use]
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Analyzes every variable of `dataset` under each combination.
    ///
    /// # Errors
    ///
    /// Returns an error if no combination is available, or if any analysis
    /// fails for a reason other than an unavailable backend or (in strict
    /// mode) unmet constraints.
    pub fn analyze(
        &self,
        dataset: &Dataset,
        combinations: &[Combination],
    ) -> Result<AnalysisResults, AnalyzeError> {
        let variables: Vec<&Variable> = dataset.variables().collect();
        let units: Vec<(usize, usize)> = (0..combinations.len())
            .flat_map(|c| (0..variables.len()).map(move |v| (c, v)))
            .collect();

        log::info!(
            "analyzing {} variables with {} combinations",
            variables.len(),
            combinations.len()
        );

        let outcomes = run_units(&units, |&(c, v)| {
            self.analyze_unit(dataset, variables[v], combinations[c])
        });

        let mut unavailable = BTreeSet::new();
        let mut results = AnalysisResults {
            variables: variables.iter().map(|v| v.name().to_string()).collect(),
            ..AnalysisResults::default()
        };

        for (&(c, v), outcome) in units.iter().zip(outcomes) {
            let combination = combinations[c];
            match outcome? {
                Outcome::Unavailable => {
                    unavailable.insert(combination);
                }
                Outcome::Analyzed(encoding, metrics) => {
                    let name = variables[v].name().to_string();
                    results
                        .encodings
                        .entry(combination)
                        .or_default()
                        .insert(name.clone(), encoding);
                    results
                        .metrics
                        .entry(combination)
                        .or_default()
                        .insert(name, metrics);
                }
            }
        }

        for combination in &unavailable {
            log::warn!("skipping {combination}: compressor is not available");
            results.encodings.remove(combination);
            results.metrics.remove(combination);
        }
        results.combinations = combinations
            .iter()
            .copied()
            .filter(|c| !unavailable.contains(c))
            .collect();

        if results.combinations.is_empty() {
            return Err(AnalyzeError::NoAvailableCombination);
        }
        Ok(results)
    }

    /// Returns the element type a variable is searched at, or why it is
    /// stored losslessly instead.
    fn searched_type(&self, dataset: &Dataset, variable: &Variable) -> Result<FloatType, Bypass> {
        if dataset.is_coordinate(variable.name()) {
            Err(Bypass::Coordinate)
        } else if variable.size() < self.settings.min_size {
            Err(Bypass::TooSmall)
        } else {
            variable.values().float_type().ok_or(Bypass::NotFloat)
        }
    }

    fn analyze_unit(
        &self,
        dataset: &Dataset,
        variable: &Variable,
        combination: Combination,
    ) -> Result<Outcome, AnalyzeError> {
        let float_type = match self.searched_type(dataset, variable) {
            Ok(float_type) => float_type,
            Err(reason) => {
                log::debug!("{} is stored losslessly ({reason:?})", variable.name());
                return Ok(Outcome::Analyzed(Encoding::Lossless, MetricsRecord::lossless()));
            }
        };

        let data = variable.last_step(&self.settings.time_dimension);
        let analyzer =
            VariableAnalyzer::new(&self.emulator, &self.metrics, &self.constraints, &self.settings);

        match analyzer.analyze(variable.name(), data.view(), float_type, combination) {
            Ok((encoding, metrics)) => {
                log::info!(
                    "{}: {encoding} (compression ratio {:.2})",
                    variable.name(),
                    metrics.compression_ratio().unwrap_or(1.0)
                );
                Ok(Outcome::Analyzed(encoding, metrics))
            }
            Err(err) if err.is_unavailable() => Ok(Outcome::Unavailable),
            Err(AnalyzeError::ConditionsNotFulfilled { margin, .. }) => {
                log::warn!(
                    "{} cannot meet the constraints with {combination} (margin {margin:.4}); storing losslessly",
                    variable.name()
                );
                Ok(Outcome::Analyzed(Encoding::Lossless, MetricsRecord::lossless()))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(feature = "parallel")]
fn run_units<T, F>(units: &[(usize, usize)], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&(usize, usize)) -> T + Sync + Send,
{
    use rayon::prelude::*;
    units.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn run_units<T, F>(units: &[(usize, usize)], f: F) -> Vec<T>
where
    F: Fn(&(usize, usize)) -> T,
{
    units.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use dial_core::{Compressor, Mode};
    use ndarray::{ArrayD, IxDyn};

    use crate::QuantizingEmulator;

    fn wave(n: usize, phase: f64) -> ArrayD<f64> {
        #[allow(clippy::cast_precision_loss)]
        ArrayD::from_shape_fn(IxDyn(&[n]), |idx| (idx[0] as f64 / 9.0 + phase).sin() * 4.0)
    }

    fn analyzer(min_size: usize) -> DatasetAnalyzer<QuantizingEmulator> {
        let settings = AnalysisSettings {
            min_size,
            ..AnalysisSettings::default()
        };
        DatasetAnalyzer::new(
            QuantizingEmulator::default(),
            "correlation_I:3".parse().unwrap(),
            settings,
        )
    }

    fn combinations() -> Vec<Combination> {
        [
            (Compressor::Sz, Mode::Abs),
            (Compressor::Zfp, Mode::Rate),
            (Compressor::Sz3, Mode::Rel),
        ]
        .into_iter()
        .map(|(compressor, mode)| Combination::new(compressor, mode).unwrap())
        .collect()
    }

    #[test]
    fn minimum_size_is_inclusive() {
        let dataset = Dataset::new()
            .with_variable(Variable::new("at_min", ["x"], wave(64, 0.0)).unwrap())
            .with_variable(Variable::new("below_min", ["x"], wave(63, 0.0)).unwrap());
        let sz_abs = Combination::new(Compressor::Sz, Mode::Abs).unwrap();

        let results = analyzer(64).analyze(&dataset, &[sz_abs]).unwrap();

        let (at_min, _) = results.get(sz_abs, "at_min").unwrap();
        assert_eq!(at_min.combination(), Some(sz_abs));
        let (below_min, metrics) = results.get(sz_abs, "below_min").unwrap();
        assert_eq!(*below_min, Encoding::Lossless);
        assert_eq!(*metrics, MetricsRecord::lossless());
    }

    #[test]
    fn results_match_per_variable_searches() {
        let mut dataset = Dataset::new();
        for i in 0..6 {
            #[allow(clippy::cast_precision_loss)]
            let values = wave(200 + 10 * i, i as f64);
            dataset.insert(Variable::new(format!("v{i}"), ["x"], values).unwrap());
        }
        let combinations = combinations();
        let analyzer = analyzer(100);

        let results = analyzer.analyze(&dataset, &combinations).unwrap();
        assert_eq!(results.combinations, combinations);
        assert_eq!(results.variables, ["v0", "v1", "v2", "v3", "v4", "v5"]);

        let single = VariableAnalyzer::new(
            &analyzer.emulator,
            &analyzer.metrics,
            &analyzer.constraints,
            &analyzer.settings,
        );
        for &combination in &combinations {
            for variable in dataset.variables() {
                let expected = single
                    .analyze(
                        variable.name(),
                        variable.values().to_f64().view(),
                        FloatType::F64,
                        combination,
                    )
                    .unwrap();
                let (encoding, metrics) = results.get(combination, variable.name()).unwrap();
                assert_eq!((encoding, metrics), (&expected.0, &expected.1));
            }
        }
    }

    #[test]
    fn units_keep_their_order() {
        let units: Vec<(usize, usize)> = (0..7)
            .flat_map(|c| (0..50).map(move |v| (c, v)))
            .collect();
        let outcomes = run_units(&units, |&(c, v)| c * 1000 + v);
        let expected: Vec<usize> = units.iter().map(|&(c, v)| c * 1000 + v).collect();
        assert_eq!(outcomes, expected);
    }
}
