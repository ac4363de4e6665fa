use dial_core::{Parameter, ParameterRange};

use crate::Relation;

/// The part of the range still under consideration.
#[derive(Debug)]
enum Window {
    /// Runs from `start` (looser side) to `end` (tighter side).
    Continuous { start: f64, end: f64 },

    /// Untested candidates `values[lo..hi]`, in ascending order.
    Discrete {
        values: Vec<i64>,
        lo: usize,
        hi: usize,
    },
}

/// Bisection state: the window, the last midpoint, and the fallback.
#[derive(Debug)]
pub(super) struct Bracket {
    window: Window,

    /// Whether passing parameters lie toward the window's end.
    ///
    /// Holds when the margin grows toward the end of the window, so the
    /// start half is kept after a pass and the end half after a failure.
    passes_toward_end: bool,

    /// Index (discrete) or value (continuous) of the last midpoint.
    mid: Option<Midpoint>,

    /// Last parameter known to pass, or the tighter bound if none has.
    safe: Parameter,
    safe_margin: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
enum Midpoint {
    Value(f64),
    Index(usize),
}

impl Bracket {
    pub(super) fn new(range: ParameterRange, relation: Relation) -> Self {
        let safe = range.tighter();

        match range {
            ParameterRange::Continuous { looser, tighter } => Self {
                window: Window::Continuous {
                    start: looser,
                    end: tighter,
                },
                passes_toward_end: relation.is_direct() == (tighter > looser),
                mid: None,
                safe,
                safe_margin: None,
            },
            ParameterRange::Discrete { looser, tighter } => {
                let values: Vec<i64> = (looser.min(tighter)..=looser.max(tighter)).collect();
                let hi = values.len();
                Self {
                    window: Window::Discrete { values, lo: 0, hi },
                    passes_toward_end: relation.is_direct(),
                    mid: None,
                    safe,
                    safe_margin: None,
                }
            }
        }
    }

    /// Returns the next parameter to evaluate, or `None` if no candidates
    /// remain.
    pub(super) fn midpoint(&mut self) -> Option<Parameter> {
        match &self.window {
            Window::Continuous { start, end } => {
                let value = 0.5 * (start + end);
                self.mid = Some(Midpoint::Value(value));
                Some(Parameter::Continuous(value))
            }
            Window::Discrete { values, lo, hi } => {
                if lo >= hi {
                    self.mid = None;
                    return None;
                }
                let index = lo + (hi - lo) / 2;
                self.mid = Some(Midpoint::Index(index));
                Some(Parameter::Discrete(values[index]))
            }
        }
    }

    /// Records a passing parameter as the new fallback.
    pub(super) fn accept(&mut self, parameter: Parameter, margin: f64) {
        self.safe = parameter;
        self.safe_margin = Some(margin);
    }

    /// Halves the window at the last midpoint, keeping the side that still
    /// holds the boundary between failing and passing parameters.
    pub(super) fn shrink(&mut self, satisfied: bool) {
        let keep_start_half = satisfied == self.passes_toward_end;

        match (&mut self.window, self.mid) {
            (Window::Continuous { start, end }, Some(Midpoint::Value(mid))) => {
                if keep_start_half {
                    *end = mid;
                } else {
                    *start = mid;
                }
            }
            (Window::Discrete { lo, hi, .. }, Some(Midpoint::Index(index))) => {
                if keep_start_half {
                    *hi = index;
                } else {
                    *lo = index + 1;
                }
            }
            _ => {}
        }
    }

    /// Returns the window in ascending value order.
    #[allow(clippy::cast_precision_loss)]
    pub(super) fn bounds(&self) -> [f64; 2] {
        match &self.window {
            Window::Continuous { start, end } => [start.min(*end), start.max(*end)],
            Window::Discrete { values, lo, hi } if lo < hi => {
                [values[*lo] as f64, values[*hi - 1] as f64]
            }
            Window::Discrete { .. } => {
                let safe = self.safe.as_f64();
                [safe, safe]
            }
        }
    }

    /// Returns the fallback parameter as the search result.
    pub(super) fn finish(&self, status: super::Status, evaluations: usize) -> super::Solution {
        super::Solution {
            parameter: self.safe,
            margin: self.safe_margin,
            status,
            evaluations,
        }
    }
}
