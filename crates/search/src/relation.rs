//! The direction in which a margin responds to its parameter.

use dial_core::{Objective, ParameterRange};

/// Fraction of the range at which the lower probe is placed.
pub const LOWER_PROBE: f64 = 0.1;

/// Fraction of the range at which the upper probe is placed.
pub const UPPER_PROBE: f64 = 0.9;

/// How the margin changes as the parameter value increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Increasing the parameter increases the margin (bit rates, precision).
    Direct,

    /// Increasing the parameter decreases the margin (error bounds).
    Inverse,
}

impl Relation {
    #[must_use]
    pub fn is_direct(self) -> bool {
        matches!(self, Self::Direct)
    }
}

/// Infers the relation by evaluating the margin at the 10th and 90th
/// percentiles of the range.
///
/// A strictly larger margin at the upper probe means [`Relation::Direct`].
/// Ties, including two equal failures, resolve to [`Relation::Inverse`].
///
/// # Errors
///
/// Returns the objective's error if either probe fails to evaluate.
pub fn probe<O: Objective>(objective: &O, range: &ParameterRange) -> Result<Relation, O::Error> {
    let low = range.fraction(LOWER_PROBE);
    let high = range.fraction(UPPER_PROBE);

    let low_margin = objective.margin(low)?;
    let high_margin = objective.margin(high)?;

    let relation = if high_margin > low_margin {
        Relation::Direct
    } else {
        Relation::Inverse
    };

    log::debug!(
        "probed margins {low_margin:.4} at {low} and {high_margin:.4} at {high}: {relation:?}"
    );

    Ok(relation)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::RefCell, convert::Infallible};

    use dial_core::Parameter;

    #[test]
    fn detects_both_directions() {
        let range = ParameterRange::continuous(1.0, 0.0).unwrap();

        let shrinking = |p: Parameter| Ok::<_, Infallible>(0.5 - p.as_f64());
        assert_eq!(probe(&shrinking, &range).unwrap(), Relation::Inverse);

        let growing = |p: Parameter| Ok::<_, Infallible>(p.as_f64() - 0.5);
        assert_eq!(probe(&growing, &range).unwrap(), Relation::Direct);
    }

    #[test]
    fn flat_margins_are_inverse() {
        let range = ParameterRange::discrete(2, 32).unwrap();
        let flat = |_: Parameter| Ok::<_, Infallible>(-1.0);
        assert_eq!(probe(&flat, &range).unwrap(), Relation::Inverse);
    }

    #[test]
    fn probes_at_percentiles() {
        let seen = RefCell::new(Vec::new());
        let objective = |p: Parameter| {
            seen.borrow_mut().push(p.as_f64());
            Ok::<_, Infallible>(0.0)
        };

        let range = ParameterRange::continuous(1.0, 32.0).unwrap();
        probe(&objective, &range).unwrap();

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 2);
        approx::assert_relative_eq!(seen[0], 4.1, epsilon = 1e-12);
        approx::assert_relative_eq!(seen[1], 28.9, epsilon = 1e-12);
    }
}
