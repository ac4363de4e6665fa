use crate::Parameter;

/// Maps a compression parameter to a signed margin.
///
/// The margin is the smallest gap between a measured metric and its
/// threshold. A non-negative margin means every constraint is met.
///
/// Closures of the form `Fn(Parameter) -> Result<f64, E>` implement this
/// trait, which keeps tests and ad hoc searches lightweight.
pub trait Objective {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Evaluates the margin at `parameter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter cannot be evaluated.
    fn margin(&self, parameter: Parameter) -> Result<f64, Self::Error>;
}

impl<F, E> Objective for F
where
    F: Fn(Parameter) -> Result<f64, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn margin(&self, parameter: Parameter) -> Result<f64, E> {
        self(parameter)
    }
}
