//! Constraint-driven search over compression parameters.
//!
//! A search looks for the parameter closest to the loosest end of a
//! [`ParameterRange`](dial_core::ParameterRange) that still satisfies every
//! constraint, by bisecting on the sign of an [`Objective`](dial_core::Objective)
//! margin.
//!
//! - [`relation`] decides which way the margin moves as the parameter grows
//! - [`bisection`] runs the search itself

pub mod bisection;
pub mod relation;

pub use relation::Relation;
