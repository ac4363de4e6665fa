use thiserror::Error;

/// Configuration for the bisection search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    accuracy_threshold: f64,
    max_depth: usize,
    retry_repeated: usize,
}

/// Errors that can occur when validating a bisection config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("accuracy_threshold must be finite and non-negative")]
    AccuracyThreshold,

    #[error("max_depth must be at least 1")]
    MaxDepth,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accuracy_threshold: 0.1,
            max_depth: 50,
            retry_repeated: 5,
        }
    }
}

impl Config {
    /// Creates a new validated config.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is negative or non-finite, or if
    /// `max_depth` is zero.
    pub fn new(
        accuracy_threshold: f64,
        max_depth: usize,
        retry_repeated: usize,
    ) -> Result<Self, ConfigError> {
        if !accuracy_threshold.is_finite() || accuracy_threshold < 0.0 {
            return Err(ConfigError::AccuracyThreshold);
        }
        if max_depth == 0 {
            return Err(ConfigError::MaxDepth);
        }

        Ok(Self {
            accuracy_threshold,
            max_depth,
            retry_repeated,
        })
    }

    /// Returns the margin below which a passing midpoint counts as converged.
    #[must_use]
    pub fn accuracy_threshold(&self) -> f64 {
        self.accuracy_threshold
    }

    /// Returns the maximum number of evaluations.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns how many times a repeated margin is tolerated.
    #[must_use]
    pub fn retry_repeated(&self) -> usize {
        self.retry_repeated
    }
}
