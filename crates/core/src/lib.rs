//! Core types and contracts for constraint-driven lossy compression tuning.
//!
//! This crate defines the shared vocabulary the search and analysis crates
//! build on:
//!
//! - [`Parameter`] and [`ParameterRange`]: a compression parameter and the
//!   bracket it is searched over
//! - [`Compressor`], [`Mode`], [`Combination`]: the compressor families and
//!   their parameter modes
//! - [`Encoding`]: the per-variable encoding string (`lossless` or
//!   `lossy:<compressor>:<mode>:<parameter>`)
//! - [`Constraints`] and [`MetricsRecord`]: ordered metric thresholds and the
//!   metric values measured at a parameter
//! - [`Emulator`] and [`FloatType`]: compresses and decompresses data in
//!   memory at its stored width
//! - [`Objective`]: maps a parameter to a signed margin
//! - [`Observer`]: receives search events and optionally returns control actions

mod compressor;
mod constraints;
mod emulator;
mod encoding;
mod metrics;
mod objective;
mod observer;
mod parameter;

pub use compressor::{Combination, Compressor, Mode, ParseError};
pub use constraints::{COMPRESSION_RATIO, Constraints, ConstraintsError};
pub use emulator::{Emulation, EmulationError, Emulator, FloatType};
pub use encoding::Encoding;
pub use metrics::{DIAGNOSTIC_METRICS, MetricsRecord};
pub use objective::Objective;
pub use observer::Observer;
pub use parameter::{Parameter, ParameterRange, RangeError, format_significant};
