use dial_core::Parameter;

/// Iteration event emitted by the bisection search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Iteration counter (1-based).
    pub iter: usize,

    /// The midpoint evaluated in this iteration.
    pub parameter: Parameter,

    /// Margin at the midpoint.
    pub margin: f64,

    /// Search bracket (in value order) before it is halved.
    pub bracket: [f64; 2],
}
