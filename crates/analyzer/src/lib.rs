//! Finds, per variable, the loosest lossy encoding that still meets a set of
//! quality or compression-ratio constraints.
//!
//! The analysis runs in layers:
//!
//! - [`ObjectiveFunction`] turns a compression parameter into a margin by
//!   emulating compression and scoring the reconstruction with a
//!   [`MetricRegistry`]
//! - [`VariableAnalyzer`] searches one variable under one compressor and mode
//! - [`DatasetAnalyzer`] repeats that for every variable and combination
//! - [`SelectionPolicy`] keeps the best combination per variable
//!
//! [`find_optimal_encoding`] wires these together from [`AnalysisOptions`].

mod analyze;
mod combination;
mod dataset;
mod emulator;
mod encoding_file;
mod error;
mod objective;
mod options;
mod selection;
mod variable;

pub mod metrics;

pub use analyze::{AnalysisResults, DatasetAnalyzer};
pub use combination::{Choice, enumerate};
pub use dataset::{Dataset, DatasetError, Values, Variable};
pub use emulator::QuantizingEmulator;
pub use encoding_file::{EncodingConfig, EncodingFileError, FileFormat};
pub use error::AnalyzeError;
pub use metrics::{MetricError, MetricRegistry};
pub use objective::ObjectiveFunction;
pub use options::{
    AnalysisOptions, DEFAULT_CONSTRAINTS, OptionsError, RelationPolicy, SearchOptions,
};
pub use selection::{Selection, SelectionPolicy};
pub use variable::{AnalysisSettings, VariableAnalyzer, parameter_range};

use dial_core::Emulator;

/// Analyzes `dataset` as configured by `options` and selects one encoding
/// per variable.
///
/// The `variables` allow-list and `fill_na` replacement are applied to a copy
/// of the dataset before analysis.
///
/// # Errors
///
/// Returns an error if the options are invalid, no requested combination is
/// available, or an analysis fails.
pub fn find_optimal_encoding<E>(
    dataset: &Dataset,
    options: &AnalysisOptions,
    emulator: E,
) -> Result<Selection, AnalyzeError>
where
    E: Emulator + Sync,
{
    let constraints = options.resolve_constraints()?;
    let combinations = options.combinations()?;
    let settings = options.settings()?;

    let mut dataset = dataset.clone();
    if let Some(names) = &options.variables {
        dataset.retain_variables(names.as_slice());
    }
    if let Some(value) = options.fill_na {
        dataset.fill_missing(value);
    }

    log::debug!("constraints: {constraints}");
    let policy = SelectionPolicy::for_constraints(&constraints);
    let analyzer = DatasetAnalyzer::new(emulator, constraints, settings);
    let results = analyzer.analyze(&dataset, &combinations)?;

    Ok(policy.select(&results))
}
