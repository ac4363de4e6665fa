/// Actions an observer can take during bisection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the search and return the last passing parameter.
    StopEarly,
}
