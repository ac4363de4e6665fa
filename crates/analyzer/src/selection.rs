use std::collections::BTreeMap;

use dial_core::{Combination, Constraints, DIAGNOSTIC_METRICS, Encoding, MetricsRecord};

use crate::AnalysisResults;

/// How the winning combination is chosen for each variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Quality is fixed: pick the largest compression ratio. Ties keep the
    /// first combination in enumeration order.
    MaximizeCompressionRatio,

    /// Compression ratio is fixed: pick the best diagnostic quality.
    ///
    /// Diagnostic metrics are visited in order, and the winner changes
    /// whenever a combination beats the best value seen so far for the
    /// current metric. The last metric therefore decides when combinations
    /// rank differently on different metrics.
    MaximizeQuality,
}

/// The chosen encoding and metrics for each variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub encodings: BTreeMap<String, Encoding>,
    pub metrics: BTreeMap<String, MetricsRecord>,
    /// The winning combination per variable.
    pub combinations: BTreeMap<String, Combination>,
}

impl SelectionPolicy {
    /// Returns the policy matching the kind of target in `constraints`.
    #[must_use]
    pub fn for_constraints(constraints: &Constraints) -> Self {
        if constraints.targets_compression_ratio() {
            Self::MaximizeQuality
        } else {
            Self::MaximizeCompressionRatio
        }
    }

    /// Picks one combination per variable.
    ///
    /// Only values present in `results` are ever selected.
    #[must_use]
    pub fn select(self, results: &AnalysisResults) -> Selection {
        let mut selection = Selection::default();

        for variable in &results.variables {
            let candidates: Vec<(Combination, &MetricsRecord)> = results
                .combinations
                .iter()
                .filter_map(|&c| Some((c, results.metrics.get(&c)?.get(variable)?)))
                .collect();

            let winner = match self {
                Self::MaximizeCompressionRatio => best_ratio(&candidates),
                Self::MaximizeQuality => best_quality(&candidates),
            };

            let Some(combination) = winner else {
                continue;
            };
            let Some((encoding, metrics)) = results.get(combination, variable) else {
                continue;
            };

            log::info!("{variable}: selected {encoding}");
            selection.encodings.insert(variable.clone(), *encoding);
            selection.metrics.insert(variable.clone(), metrics.clone());
            selection.combinations.insert(variable.clone(), combination);
        }

        selection
    }
}

fn best_ratio(candidates: &[(Combination, &MetricsRecord)]) -> Option<Combination> {
    let mut best: Option<(Combination, f64)> = None;
    for &(combination, metrics) in candidates {
        let ratio = metrics.compression_ratio().unwrap_or(f64::NEG_INFINITY);
        if best.is_none_or(|(_, top)| ratio > top) {
            best = Some((combination, ratio));
        }
    }
    best.map(|(combination, _)| combination)
}

fn best_quality(candidates: &[(Combination, &MetricsRecord)]) -> Option<Combination> {
    let mut winner = None;
    let mut best = [-1.0; DIAGNOSTIC_METRICS.len()];

    for &(combination, metrics) in candidates {
        for (top, name) in best.iter_mut().zip(DIAGNOSTIC_METRICS) {
            match metrics.get(name) {
                Some(value) if value > *top => {
                    *top = value;
                    winner = Some(combination);
                }
                _ => {}
            }
        }
    }

    // Records without diagnostics (lossless bypasses) keep the first
    // combination so that every variable appears in the selection.
    winner.or_else(|| candidates.first().map(|&(combination, _)| combination))
}

#[cfg(test)]
mod tests {
    use super::*;

    use dial_core::{Compressor, Mode, Parameter};

    fn combination(compressor: Compressor, mode: Mode) -> Combination {
        Combination::new(compressor, mode).unwrap()
    }

    fn record(pairs: &[(&str, f64)]) -> MetricsRecord {
        pairs.iter().copied().collect()
    }

    fn results(rows: Vec<(Combination, MetricsRecord)>) -> AnalysisResults {
        let mut results = AnalysisResults {
            variables: vec!["t".into()],
            ..AnalysisResults::default()
        };
        for (combination, metrics) in rows {
            results.combinations.push(combination);
            results.encodings.entry(combination).or_default().insert(
                "t".into(),
                Encoding::lossy(combination, Parameter::Continuous(0.5)),
            );
            results
                .metrics
                .entry(combination)
                .or_default()
                .insert("t".into(), metrics);
        }
        results
    }

    #[test]
    fn quality_target_picks_largest_ratio() {
        let sz = combination(Compressor::Sz, Mode::Abs);
        let zfp = combination(Compressor::Zfp, Mode::Rate);
        let sz3 = combination(Compressor::Sz3, Mode::Rel);
        let results = results(vec![
            (zfp, record(&[("compression_ratio", 4.0)])),
            (sz, record(&[("compression_ratio", 9.5)])),
            (sz3, record(&[("compression_ratio", 7.0)])),
        ]);

        let selection = SelectionPolicy::MaximizeCompressionRatio.select(&results);
        assert_eq!(selection.combinations["t"], sz);
        assert_eq!(selection.metrics["t"].compression_ratio(), Some(9.5));

        for metrics in results.metrics.values() {
            assert!(selection.metrics["t"].compression_ratio() >= metrics["t"].compression_ratio());
        }
    }

    #[test]
    fn ties_keep_first_combination() {
        let zfp = combination(Compressor::Zfp, Mode::Accuracy);
        let sz = combination(Compressor::Sz, Mode::Abs);
        let results = results(vec![
            (zfp, record(&[("compression_ratio", 6.0)])),
            (sz, record(&[("compression_ratio", 6.0)])),
        ]);

        let selection = SelectionPolicy::MaximizeCompressionRatio.select(&results);
        assert_eq!(selection.combinations["t"], zfp);
    }

    #[test]
    fn ratio_target_lets_last_metric_decide() {
        let a = combination(Compressor::Zfp, Mode::Rate);
        let b = combination(Compressor::Sz, Mode::Rel);
        // `a` wins on correlation_I, `b` on ssim_I.
        let results = results(vec![
            (
                a,
                record(&[("compression_ratio", 5.0), ("correlation_I", 6.0), ("ssim_I", 3.0)]),
            ),
            (
                b,
                record(&[("compression_ratio", 5.0), ("correlation_I", 5.0), ("ssim_I", 4.0)]),
            ),
        ]);

        let selection = SelectionPolicy::MaximizeQuality.select(&results);
        assert_eq!(selection.combinations["t"], b);
    }

    #[test]
    fn ratio_target_update_is_per_metric() {
        let a = combination(Compressor::Zfp, Mode::Rate);
        let b = combination(Compressor::Sz, Mode::Rel);
        // `b` beats `a` on correlation_I only, and the ssim_I best stays
        // with `a`, but the winner is still the last combination to improve
        // any metric.
        let results = results(vec![
            (a, record(&[("correlation_I", 4.0), ("ssim_I", 5.0)])),
            (b, record(&[("correlation_I", 4.5), ("ssim_I", 2.0)])),
        ]);

        let selection = SelectionPolicy::MaximizeQuality.select(&results);
        assert_eq!(selection.combinations["t"], b);
    }

    #[test]
    fn lossless_records_are_still_selected() {
        let a = combination(Compressor::Zfp, Mode::Rate);
        let b = combination(Compressor::Sz, Mode::Rel);
        let results = results(vec![
            (a, MetricsRecord::lossless()),
            (b, MetricsRecord::lossless()),
        ]);

        let selection = SelectionPolicy::MaximizeQuality.select(&results);
        assert_eq!(selection.combinations["t"], a);
    }

    #[test]
    fn policy_follows_constraints() {
        let quality: Constraints = "ssim_I:3".parse().unwrap();
        let ratio: Constraints = "compression_ratio:10".parse().unwrap();
        assert_eq!(
            SelectionPolicy::for_constraints(&quality),
            SelectionPolicy::MaximizeCompressionRatio
        );
        assert_eq!(
            SelectionPolicy::for_constraints(&ratio),
            SelectionPolicy::MaximizeQuality
        );
    }
}
