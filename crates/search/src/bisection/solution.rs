use dial_core::Parameter;

/// Why the bisection search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A margin landed within the accuracy threshold.
    Converged,

    /// Reached the evaluation limit.
    MaxDepth,

    /// The same margin repeated more often than the retry budget allows.
    Stalled,

    /// No untested candidates remain in an integer range.
    Exhausted,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of a bisection search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// The selected parameter.
    pub parameter: Parameter,

    /// Margin at the selected parameter, or `None` if it was never evaluated
    /// (the tighter bound, when no midpoint passed).
    pub margin: Option<f64>,

    /// Final search status.
    pub status: Status,

    /// Number of objective evaluations.
    pub evaluations: usize,
}

impl Solution {
    /// Returns `true` if the parameter is known to satisfy the constraints.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.margin.is_some_and(|m| m >= 0.0)
    }
}
