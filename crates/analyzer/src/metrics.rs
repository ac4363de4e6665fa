//! Quality metrics comparing reconstructed data to a reference.
//!
//! Metrics with an `_I` suffix are "nines" indices: `-log10(1 - x)` for
//! similarity scores and `-log10(x)` for normalized errors, so that larger is
//! always better and each unit is one more decimal digit of fidelity.

use std::{collections::BTreeMap, fmt, sync::Arc};

use dial_core::{COMPRESSION_RATIO, MetricsRecord};
use ndarray::{ArrayViewD, CowArray, IxDyn};
use thiserror::Error;

/// Replaces NaN in either array before computing metrics.
pub const MISSING_VALUE_SENTINEL: f64 = -1000.0;

/// Upper bound of every nines index, reached by a perfect reconstruction.
pub const MAX_NINES: f64 = 15.0;

/// A metric comparing `(reference, target)` arrays of identical shape.
pub type MetricFn = Arc<dyn Fn(ArrayViewD<'_, f64>, ArrayViewD<'_, f64>) -> f64 + Send + Sync>;

/// Errors that can occur when computing metrics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("unknown metric `{0}`")]
    Unknown(String),

    #[error("shape mismatch: reference {reference:?}, target {target:?}")]
    ShapeMismatch {
        reference: Vec<usize>,
        target: Vec<usize>,
    },
}

/// Named metric functions.
///
/// The default registry holds every built-in metric. Custom metrics can be
/// registered under new names or replace built-ins.
#[derive(Clone)]
pub struct MetricRegistry {
    metrics: BTreeMap<String, MetricFn>,
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.metrics.keys()).finish()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl MetricRegistry {
    /// Creates a registry with no metrics.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }

    /// Creates a registry with every built-in metric.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("rmse", rmse);
        registry.register("nrmse", nrmse);
        registry.register("nrmse_I", |r, t| nines(nrmse(r, t)));
        registry.register("mean_absolute_error", mean_absolute_error);
        registry.register("max_absolute_error", max_absolute_error);
        registry.register("correlation", correlation);
        registry.register("correlation_I", |r, t| nines(1.0 - correlation(r, t)));
        registry.register("ssim", ssim);
        registry.register("ssim_I", |r, t| nines(1.0 - ssim(r, t)));
        registry.register("psnr", psnr);
        registry
    }

    /// Registers `metric` under `name`, replacing any existing entry.
    pub fn register<F>(&mut self, name: impl Into<String>, metric: F)
    where
        F: Fn(ArrayViewD<'_, f64>, ArrayViewD<'_, f64>) -> f64 + Send + Sync + 'static,
    {
        self.metrics.insert(name.into(), Arc::new(metric));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Computes the named metrics between `reference` and `target`.
    ///
    /// [`COMPRESSION_RATIO`] is skipped since it cannot be measured from data.
    /// NaN in either array is replaced by [`MISSING_VALUE_SENTINEL`] first.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is not registered or the shapes differ.
    pub fn compute<'n>(
        &self,
        reference: ArrayViewD<'_, f64>,
        target: ArrayViewD<'_, f64>,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<MetricsRecord, MetricError> {
        if reference.shape() != target.shape() {
            return Err(MetricError::ShapeMismatch {
                reference: reference.shape().to_vec(),
                target: target.shape().to_vec(),
            });
        }

        let selected = names
            .into_iter()
            .filter(|name| *name != COMPRESSION_RATIO)
            .map(|name| {
                self.metrics
                    .get(name)
                    .map(|metric| (name, metric))
                    .ok_or_else(|| MetricError::Unknown(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let reference = without_nan(reference);
        let target = without_nan(target);

        Ok(selected
            .into_iter()
            .map(|(name, metric)| (name, metric(reference.view(), target.view())))
            .collect())
    }
}

fn without_nan(data: ArrayViewD<'_, f64>) -> CowArray<'_, f64, IxDyn> {
    if data.iter().any(|v| v.is_nan()) {
        log::warn!("substituting {MISSING_VALUE_SENTINEL} for NaN before computing metrics");
        CowArray::from(data.mapv(|v| if v.is_nan() { MISSING_VALUE_SENTINEL } else { v }))
    } else {
        CowArray::from(data)
    }
}

/// Maps a deficit in `[0, 1]` to its nines index, capped at [`MAX_NINES`].
fn nines(deficit: f64) -> f64 {
    if deficit.is_nan() {
        return 0.0;
    }
    if deficit <= 0.0 {
        return MAX_NINES;
    }
    (-deficit.log10()).clamp(0.0, MAX_NINES)
}

#[allow(clippy::cast_precision_loss)]
fn mean(data: ArrayViewD<'_, f64>) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.sum() / data.len() as f64
}

fn value_range(data: ArrayViewD<'_, f64>) -> f64 {
    let (min, max) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}

fn differences<'a, 'b>(
    reference: ArrayViewD<'a, f64>,
    target: ArrayViewD<'b, f64>,
) -> impl Iterator<Item = f64> {
    reference.into_iter().zip(target).map(|(r, t)| t - r)
}

#[allow(clippy::cast_precision_loss)]
fn mean_squared_error(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> f64 {
    let n = reference.len();
    if n == 0 {
        return 0.0;
    }
    differences(reference, target).map(|d| d * d).sum::<f64>() / n as f64
}

/// Root mean squared error.
pub fn rmse(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> f64 {
    mean_squared_error(reference, target).sqrt()
}

/// RMSE divided by the value range of the reference.
pub fn nrmse(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> f64 {
    let range = value_range(reference.view());
    let error = rmse(reference, target);
    if range > 0.0 {
        error / range
    } else if error == 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn mean_absolute_error(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> f64 {
    let n = reference.len();
    if n == 0 {
        return 0.0;
    }
    differences(reference, target).map(f64::abs).sum::<f64>() / n as f64
}

pub fn max_absolute_error(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> f64 {
    differences(reference, target)
        .map(f64::abs)
        .fold(0.0, f64::max)
}

/// First and second moments shared by correlation and SSIM.
struct Moments {
    mean_r: f64,
    mean_t: f64,
    var_r: f64,
    var_t: f64,
    cov: f64,
}

#[allow(clippy::cast_precision_loss)]
fn moments(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> Moments {
    let mean_r = mean(reference.view());
    let mean_t = mean(target.view());
    let n = reference.len().max(1) as f64;

    let (var_r, var_t, cov) = reference.iter().zip(target.iter()).fold(
        (0.0, 0.0, 0.0),
        |(vr, vt, c), (r, t)| {
            let (dr, dt) = (r - mean_r, t - mean_t);
            (vr + dr * dr, vt + dt * dt, c + dr * dt)
        },
    );

    Moments {
        mean_r,
        mean_t,
        var_r: var_r / n,
        var_t: var_t / n,
        cov: cov / n,
    }
}

/// Pearson correlation coefficient.
///
/// Constant inputs have no defined correlation; identical arrays score 1 and
/// anything else scores 0.
pub fn correlation(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> f64 {
    let m = moments(reference.view(), target.view());
    if m.var_r > 0.0 && m.var_t > 0.0 {
        (m.cov / (m.var_r.sqrt() * m.var_t.sqrt())).clamp(-1.0, 1.0)
    } else if reference == target {
        1.0
    } else {
        0.0
    }
}

/// Structural similarity computed over the whole field as one window.
pub fn ssim(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> f64 {
    let range = value_range(reference.view());
    let range = if range > 0.0 { range } else { 1.0 };
    let c1 = (0.01 * range).powi(2);
    let c2 = (0.03 * range).powi(2);

    let m = moments(reference, target);
    let numerator = (2.0 * m.mean_r * m.mean_t + c1) * (2.0 * m.cov + c2);
    let denominator =
        (m.mean_r.powi(2) + m.mean_t.powi(2) + c1) * (m.var_r + m.var_t + c2);
    numerator / denominator
}

/// Peak signal-to-noise ratio in decibels, using the reference value range
/// as the peak.
pub fn psnr(reference: ArrayViewD<'_, f64>, target: ArrayViewD<'_, f64>) -> f64 {
    let range = value_range(reference.view());
    let mse = mean_squared_error(reference, target);
    if mse == 0.0 {
        return f64::INFINITY;
    }
    if range == 0.0 {
        return f64::NEG_INFINITY;
    }
    20.0 * range.log10() - 10.0 * mse.log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::{ArrayD, IxDyn};

    fn ramp(n: usize) -> ArrayD<f64> {
        #[allow(clippy::cast_precision_loss)]
        ArrayD::from_shape_fn(IxDyn(&[n]), |idx| idx[0] as f64)
    }

    #[test]
    fn perfect_reconstruction_scores_max() {
        let data = ramp(100);
        let registry = MetricRegistry::default();

        let record = registry
            .compute(
                data.view(),
                data.view(),
                ["rmse", "correlation_I", "ssim_I", "nrmse_I", "compression_ratio"],
            )
            .unwrap();

        assert_eq!(record.get("rmse"), Some(0.0));
        assert_eq!(record.get("correlation_I"), Some(MAX_NINES));
        assert_eq!(record.get("ssim_I"), Some(MAX_NINES));
        assert_eq!(record.get("nrmse_I"), Some(MAX_NINES));
        assert_eq!(record.compression_ratio(), None);
    }

    fn shifted(reference: ArrayViewD<'_, f64>, offset: f64) -> (f64, f64, f64) {
        let target = reference.mapv(|v| v - offset);
        (
            rmse(reference.view(), target.view()),
            mean_absolute_error(reference.view(), target.view()),
            max_absolute_error(reference, target.view()),
        )
    }

    #[test]
    fn errors_accept_views_of_different_lifetimes() {
        let reference = ramp(8);
        let (root, mean, max) = shifted(reference.view(), 0.25);
        assert_relative_eq!(root, 0.25);
        assert_relative_eq!(mean, 0.25);
        assert_relative_eq!(max, 0.25);
    }

    #[test]
    fn errors_against_known_values() {
        let reference = ramp(4);
        let target = reference.mapv(|v| v + 0.5);
        let (r, t) = (reference.view(), target.view());

        assert_relative_eq!(rmse(r.view(), t.view()), 0.5);
        assert_relative_eq!(nrmse(r.view(), t.view()), 0.5 / 3.0);
        assert_relative_eq!(mean_absolute_error(r.view(), t.view()), 0.5);
        assert_relative_eq!(max_absolute_error(r.view(), t.view()), 0.5);
        assert_relative_eq!(correlation(r.view(), t.view()), 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            psnr(r.view(), t.view()),
            20.0 * 3.0_f64.log10() - 10.0 * 0.25_f64.log10(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn nines_grow_with_fidelity() {
        let reference = ramp(1000).mapv(f64::sin);
        let coarse = reference.mapv(|v| (v * 10.0).round() / 10.0);
        let fine = reference.mapv(|v| (v * 1000.0).round() / 1000.0);
        let registry = MetricRegistry::default();

        let score = |target: &ArrayD<f64>| {
            registry
                .compute(reference.view(), target.view(), ["correlation_I", "ssim_I"])
                .unwrap()
        };
        let (coarse, fine) = (score(&coarse), score(&fine));

        for name in ["correlation_I", "ssim_I"] {
            let (c, f) = (coarse.get(name).unwrap(), fine.get(name).unwrap());
            assert!(c > 0.0 && c < f && f < MAX_NINES, "{name}: {c} vs {f}");
        }
    }

    #[test]
    fn nan_is_replaced_by_sentinel() {
        let mut reference = ramp(4);
        reference[[0]] = f64::NAN;
        let mut target = ramp(4);
        target[[0]] = MISSING_VALUE_SENTINEL;

        let record = MetricRegistry::default()
            .compute(reference.view(), target.view(), ["max_absolute_error"])
            .unwrap();
        assert_eq!(record.get("max_absolute_error"), Some(0.0));
    }

    #[test]
    fn rejects_unknown_names_and_shapes() {
        let registry = MetricRegistry::default();
        let data = ramp(4);

        assert_eq!(
            registry.compute(data.view(), data.view(), ["sharpness"]),
            Err(MetricError::Unknown("sharpness".into()))
        );

        let other = ramp(5);
        assert!(matches!(
            registry.compute(data.view(), other.view(), ["rmse"]),
            Err(MetricError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn custom_metrics_can_be_registered() {
        let mut registry = MetricRegistry::empty();
        registry.register("count", |r, _| r.len() as f64);

        let data = ramp(6);
        let record = registry.compute(data.view(), data.view(), ["count"]).unwrap();
        assert_eq!(record.get("count"), Some(6.0));
        assert!(!registry.contains("rmse"));
    }
}
