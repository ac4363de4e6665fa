use std::{fmt, str::FromStr};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};
use thiserror::Error;

use crate::MetricsRecord;

/// Name of the pseudo-metric measuring compressed size reduction.
pub const COMPRESSION_RATIO: &str = "compression_ratio";

/// Metric thresholds a compressed variable must meet.
///
/// Entries keep insertion order, which matters when listing the metrics to
/// compute and when reporting results. A constraint on [`COMPRESSION_RATIO`]
/// turns the search into a compression-ratio target.
///
/// Constraints parse from the compact text form `name:threshold,...`:
///
/// ```
/// use dial_core::Constraints;
///
/// let constraints: Constraints = "correlation_I:5,ssim_I:2".parse().unwrap();
/// assert_eq!(constraints.get("ssim_I"), Some(2.0));
/// assert!(!constraints.targets_compression_ratio());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    entries: Vec<(String, f64)>,
}

/// Errors that can occur when parsing constraint text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintsError {
    #[error("no constraints given")]
    Empty,

    #[error("constraint `{0}` must have the form name:threshold")]
    Malformed(String),

    #[error("threshold `{value}` for {name} is not a finite number")]
    InvalidThreshold { name: String, value: String },
}

impl Constraints {
    /// Creates an empty set of constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the threshold for `name`, keeping its position if already present.
    pub fn insert(&mut self, name: impl Into<String>, threshold: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = threshold,
            None => self.entries.push((name, threshold)),
        }
    }

    /// Builder form of [`Constraints::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, threshold: f64) -> Self {
        self.insert(name, threshold);
        self
    }

    /// Returns the threshold for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find_map(|(n, t)| (n == name).then_some(*t))
    }

    /// Iterates over `(name, threshold)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), *t))
    }

    /// Iterates over the constrained metric names that must be computed from
    /// reconstructed data, skipping [`COMPRESSION_RATIO`].
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .map(|(name, _)| name)
            .filter(|name| *name != COMPRESSION_RATIO)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if a compression ratio target is among the constraints.
    #[must_use]
    pub fn targets_compression_ratio(&self) -> bool {
        self.get(COMPRESSION_RATIO).is_some()
    }

    /// Returns a copy with each of `names` added at `threshold`, unless the
    /// metric is already constrained.
    #[must_use]
    pub fn with_diagnostics(&self, names: &[&str], threshold: f64) -> Self {
        let mut out = self.clone();
        for name in names {
            if out.get(name).is_none() {
                out.insert(*name, threshold);
            }
        }
        out
    }

    /// Returns the smallest `value - threshold` over all constraints.
    ///
    /// Returns `None` if there are no constraints or a constrained metric is
    /// missing from `metrics`.
    #[must_use]
    pub fn margin(&self, metrics: &MetricsRecord) -> Option<f64> {
        self.iter()
            .map(|(name, threshold)| metrics.get(name).map(|value| value - threshold))
            .try_fold(None, |acc: Option<f64>, diff| {
                let diff = diff?;
                Some(Some(acc.map_or(diff, |m| m.min(diff))))
            })
            .flatten()
    }

    /// Returns `true` if every constraint is met by `metrics`.
    #[must_use]
    pub fn satisfied_by(&self, metrics: &MetricsRecord) -> bool {
        self.margin(metrics).is_some_and(|m| m >= 0.0)
    }
}

impl FromStr for Constraints {
    type Err = ConstraintsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut constraints = Self::new();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = entry
                .split_once(':')
                .ok_or_else(|| ConstraintsError::Malformed(entry.to_string()))?;
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() {
                return Err(ConstraintsError::Malformed(entry.to_string()));
            }

            let threshold = value
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite())
                .ok_or_else(|| ConstraintsError::InvalidThreshold {
                    name: name.to_string(),
                    value: value.to_string(),
                })?;

            constraints.insert(name, threshold);
        }

        if constraints.is_empty() {
            return Err(ConstraintsError::Empty);
        }
        Ok(constraints)
    }
}

/// Formats as `name:threshold,...` in insertion order.
impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, threshold)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}:{threshold}")?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Constraints {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut constraints = Self::new();
        for (name, threshold) in iter {
            constraints.insert(name, threshold);
        }
        constraints
    }
}

impl Serialize for Constraints {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, threshold) in self.iter() {
            map.serialize_entry(name, &threshold)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Constraints {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Constraints;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of metric names to thresholds")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut constraints = Constraints::new();
                while let Some((name, threshold)) = access.next_entry::<String, f64>()? {
                    if !threshold.is_finite() {
                        return Err(serde::de::Error::custom(format!(
                            "threshold for {name} must be finite"
                        )));
                    }
                    constraints.insert(name, threshold);
                }
                Ok(constraints)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}
