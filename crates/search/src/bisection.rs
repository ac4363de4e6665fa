//! Bisection on the sign of a constraint margin.
//!
//! # Algorithm
//!
//! The search starts from a [`ParameterRange`] running from its looser to its
//! tighter bound, and a [`Relation`] saying how the margin moves with the
//! parameter value. Each iteration evaluates the midpoint of the current
//! bracket and keeps the half that still contains the boundary between
//! failing and passing parameters:
//!
//! - A passing midpoint (margin above zero) becomes the new fallback and the
//!   search moves toward the looser end.
//! - A failing midpoint moves the search toward the tighter end.
//!
//! The search stops when a margin lands in `[0, accuracy_threshold)`, when the
//! same margin repeats more often than the retry budget allows, or after
//! `max_depth` evaluations. Every stop other than convergence returns the
//! last passing parameter, which is the tighter bound if no midpoint passed.
//!
//! Integer ranges bisect over the list of candidate values instead. An
//! evaluated candidate is never revisited, and the search reports
//! [`Status::Exhausted`] once no candidates remain.
//!
//! # Observer Events
//!
//! The search emits one [`Event`] per evaluated midpoint. Observers can
//! return [`Action::StopEarly`] to halt and receive the fallback parameter.

mod action;
mod bracket;
mod config;
mod event;
mod solution;


pub use action::Action;
pub use config::{Config, ConfigError};
pub use event::Event;
pub use solution::{Solution, Status};

use dial_core::{Objective, Observer, ParameterRange};

use crate::Relation;

use bracket::Bracket;

/// Searches `range` for the loosest parameter whose margin is non-negative.
///
/// The observer receives an [`Event`] after each evaluation.
/// See the [module docs](self) for the stopping rules.
///
/// # Errors
///
/// Returns the objective's error if any evaluation fails.
pub fn solve<O, Obs>(
    objective: &O,
    range: ParameterRange,
    relation: Relation,
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, O::Error>
where
    O: Objective,
    Obs: Observer<Event, Action>,
{
    let mut bracket = Bracket::new(range, relation);
    let mut last_margin: Option<f64> = None;
    let mut retries_left = config.retry_repeated();

    for iter in 1..=config.max_depth() {
        let Some(mid) = bracket.midpoint() else {
            return Ok(bracket.finish(Status::Exhausted, iter - 1));
        };

        let margin = objective.margin(mid)?;
        let satisfied = margin > 0.0;

        log::debug!(
            "iteration {iter}: bracket {:?}, mid {mid}, margin {margin:.6}",
            bracket.bounds()
        );

        if margin >= 0.0 {
            bracket.accept(mid, margin);
        }

        let event = Event {
            iter,
            parameter: mid,
            margin,
            bracket: bracket.bounds(),
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(bracket.finish(Status::StoppedByObserver, iter));
        }

        if margin >= 0.0 && margin < config.accuracy_threshold() {
            return Ok(Solution {
                parameter: mid,
                margin: Some(margin),
                status: Status::Converged,
                evaluations: iter,
            });
        }

        #[allow(clippy::float_cmp)]
        if last_margin == Some(margin) {
            if retries_left == 0 {
                log::debug!("margin {margin} repeated with no retries left");
                return Ok(bracket.finish(Status::Stalled, iter));
            }
            retries_left -= 1;
        }
        last_margin = Some(margin);

        bracket.shrink(satisfied);
    }

    Ok(bracket.finish(Status::MaxDepth, config.max_depth()))
}

/// Runs [`solve`] without observation.
///
/// # Errors
///
/// Returns the objective's error if any evaluation fails.
pub fn solve_unobserved<O: Objective>(
    objective: &O,
    range: ParameterRange,
    relation: Relation,
    config: &Config,
) -> Result<Solution, O::Error> {
    solve(objective, range, relation, config, ())
}
