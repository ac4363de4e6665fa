//! Analysis options, as loaded from configuration files.

use std::{fs, io, path::{Path, PathBuf}};

use dial_core::{Combination, Compressor, Constraints, ConstraintsError, Mode, ParseError};
use dial_search::bisection::{self, ConfigError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    AnalysisSettings,
    combination::{self, Choice},
};

/// Constraints used when none are given.
pub const DEFAULT_CONSTRAINTS: &str = "correlation_I:5,ssim_I:2";

/// How the direction of the margin is determined for each search.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelationPolicy {
    /// Evaluate the margin at two points and compare.
    #[default]
    Probe,

    /// Assume the margin grows with the parameter value.
    Direct,

    /// Assume the margin shrinks as the parameter value grows.
    Inverse,
}

/// Bisection settings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchOptions {
    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold: f64,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_retry_repeated")]
    pub retry_repeated: usize,
}

fn default_accuracy_threshold() -> f64 {
    0.1
}

fn default_max_depth() -> usize {
    50
}

fn default_retry_repeated() -> usize {
    5
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            accuracy_threshold: default_accuracy_threshold(),
            max_depth: default_max_depth(),
            retry_repeated: default_retry_repeated(),
        }
    }
}

/// Everything that configures an analysis.
///
/// Exactly one of `constraints` (compact text) or `thresholds` (a map) must
/// be given. A missing file section falls back to its default.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisOptions {
    /// Compressor to consider, or `all`.
    #[serde(default)]
    pub compressor: Choice<Compressor>,

    /// Mode to consider, or `all`. A specific mode needs a specific compressor.
    #[serde(default)]
    pub mode: Choice<Mode>,

    /// Constraints as `name:threshold,...`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,

    /// Constraints as a map of metric names to thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Constraints>,

    /// Replaces NaN before analysis, letting gappy fields compress lossily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_na: Option<f64>,

    /// Restricts the analysis to these data variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,

    #[serde(default = "default_min_size")]
    pub min_size: usize,

    #[serde(default = "default_time_dimension")]
    pub time_dimension: String,

    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub relation: RelationPolicy,

    #[serde(default)]
    pub search: SearchOptions,
}

fn default_min_size() -> usize {
    10_000
}

fn default_time_dimension() -> String {
    "time".to_string()
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            compressor: Choice::All,
            mode: Choice::All,
            constraints: Some(DEFAULT_CONSTRAINTS.to_string()),
            thresholds: None,
            fill_na: None,
            variables: None,
            min_size: default_min_size(),
            time_dimension: default_time_dimension(),
            strict: false,
            relation: RelationPolicy::default(),
            search: SearchOptions::default(),
        }
    }
}

/// Errors that can occur when resolving or loading options.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("give either constraints or thresholds, not both")]
    ConflictingConstraints,

    #[error("no constraints or thresholds given")]
    MissingConstraints,

    #[error("invalid constraints")]
    Constraints(#[from] ConstraintsError),

    #[error("invalid compressor or mode")]
    Combination(#[from] ParseError),

    #[error("mode {mode} needs a specific compressor")]
    ModeWithoutCompressor { mode: Mode },

    #[error("{combination} cannot be tuned and is never analyzed")]
    UnreliableMode { combination: Combination },

    #[error("invalid search settings")]
    Search(#[from] ConfigError),

    #[error("unsupported options format `{0}`")]
    UnsupportedFormat(String),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid YAML options")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON options")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML options")]
    Toml(#[from] toml::de::Error),
}

impl AnalysisOptions {
    /// Options with compact constraint text and every other field defaulted.
    #[must_use]
    pub fn with_constraints(constraints: impl Into<String>) -> Self {
        Self {
            constraints: Some(constraints.into()),
            ..Self::default()
        }
    }

    /// Options with a threshold map and every other field defaulted.
    #[must_use]
    pub fn with_thresholds(thresholds: Constraints) -> Self {
        Self {
            constraints: None,
            thresholds: Some(thresholds),
            ..Self::default()
        }
    }

    /// Returns the constraints from whichever of the two fields is set.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one field is set and it parses.
    pub fn resolve_constraints(&self) -> Result<Constraints, OptionsError> {
        match (&self.constraints, &self.thresholds) {
            (Some(_), Some(_)) => Err(OptionsError::ConflictingConstraints),
            (None, None) => Err(OptionsError::MissingConstraints),
            (Some(text), None) => Ok(text.parse()?),
            (None, Some(thresholds)) if thresholds.is_empty() => {
                Err(ConstraintsError::Empty.into())
            }
            (None, Some(thresholds)) => Ok(thresholds.clone()),
        }
    }

    /// Returns the combinations selected by `compressor` and `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection is inconsistent.
    pub fn combinations(&self) -> Result<Vec<Combination>, OptionsError> {
        combination::enumerate(self.compressor, self.mode)
    }

    /// Returns the validated per-variable settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the search settings are invalid.
    pub fn settings(&self) -> Result<AnalysisSettings, OptionsError> {
        let search = bisection::Config::new(
            self.search.accuracy_threshold,
            self.search.max_depth,
            self.search.retry_repeated,
        )?;

        Ok(AnalysisSettings {
            search,
            relation: self.relation,
            strict: self.strict,
            time_dimension: self.time_dimension.clone(),
            min_size: self.min_size,
        })
    }

    /// Parses YAML options.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid options YAML.
    pub fn from_yaml_str(text: &str) -> Result<Self, OptionsError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parses JSON options.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid options JSON.
    pub fn from_json_str(text: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parses TOML options.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid options TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads options from a `.yaml`, `.yml`, `.json`, or `.toml` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has another extension,
    /// or does not parse.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let extension = extension(path);

        let read = || {
            fs::read_to_string(path).map_err(|source| OptionsError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&read()?),
            "json" => Self::from_json_str(&read()?),
            "toml" => Self::from_toml_str(&read()?),
            other => Err(OptionsError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Interprets a command-line argument as an options file if it ends in
    /// one of the extensions [`from_path`](Self::from_path) reads, and as
    /// compact constraint text otherwise.
    ///
    /// Thresholds may contain a `.`, so any other extension-like suffix is
    /// part of the constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument names an options file that cannot
    /// be loaded.
    pub fn from_arg(arg: &str) -> Result<Self, OptionsError> {
        if OPTIONS_EXTENSIONS.contains(&extension(Path::new(arg)).as_str()) {
            Self::from_path(arg)
        } else {
            Ok(Self::with_constraints(arg))
        }
    }
}

const OPTIONS_EXTENSIONS: [&str; 4] = ["yaml", "yml", "json", "toml"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_quality_constraints() {
        let options = AnalysisOptions::default();
        let constraints = options.resolve_constraints().unwrap();

        assert_eq!(constraints.to_string(), DEFAULT_CONSTRAINTS);
        assert_eq!(options.combinations().unwrap().len(), 9);

        let settings = options.settings().unwrap();
        assert_eq!(settings.min_size, 10_000);
        assert_eq!(settings.time_dimension, "time");
        assert_eq!(settings.search, bisection::Config::default());
    }

    #[test]
    fn arguments_with_decimal_thresholds_are_constraints() {
        let options = AnalysisOptions::from_arg("correlation_I:4.5,ssim_I:2").unwrap();
        let constraints = options.resolve_constraints().unwrap();
        assert_eq!(constraints.get("correlation_I"), Some(4.5));
        assert_eq!(constraints.get("ssim_I"), Some(2.0));

        let ratio = AnalysisOptions::from_arg("compression_ratio:2.5").unwrap();
        assert_eq!(ratio.constraints.as_deref(), Some("compression_ratio:2.5"));
    }

    #[test]
    fn arguments_with_options_extensions_are_files() {
        for name in ["missing.yaml", "missing.YML", "missing.json", "missing.toml"] {
            let path = std::env::temp_dir().join(format!("dial-{}-{name}", std::process::id()));
            let arg = path.to_str().unwrap();
            assert!(
                matches!(AnalysisOptions::from_arg(arg), Err(OptionsError::Io { .. })),
                "{arg}"
            );
        }
    }

    #[test]
    fn exactly_one_constraint_source() {
        let mut options = AnalysisOptions::with_thresholds(
            Constraints::new().with("compression_ratio", 10.0),
        );
        assert!(options.resolve_constraints().unwrap().targets_compression_ratio());

        options.constraints = Some("ssim_I:3".into());
        assert!(matches!(
            options.resolve_constraints(),
            Err(OptionsError::ConflictingConstraints)
        ));

        options.constraints = None;
        options.thresholds = None;
        assert!(matches!(
            options.resolve_constraints(),
            Err(OptionsError::MissingConstraints)
        ));
    }

    #[test]
    fn parses_yaml() {
        let options = AnalysisOptions::from_yaml_str(
            "compressor: sz3\n\
             mode: pw_rel\n\
             thresholds:\n  ssim_I: 4\n  correlation_I: 6\n\
             fill_na: -999.0\n\
             strict: true\n\
             search:\n  max_depth: 20\n",
        )
        .unwrap();

        assert_eq!(options.compressor, Choice::Only(Compressor::Sz3));
        assert_eq!(options.mode, Choice::Only(Mode::PwRel));
        assert_eq!(
            options.resolve_constraints().unwrap().to_string(),
            "ssim_I:4,correlation_I:6"
        );
        assert_eq!(options.fill_na, Some(-999.0));
        assert!(options.strict);
        assert_eq!(options.search.max_depth, 20);
        assert_eq!(options.search.retry_repeated, 5);
    }

    #[test]
    fn parses_toml_and_json() {
        let toml_options = AnalysisOptions::from_toml_str(
            "compressor = \"zfp\"\nconstraints = \"compression_ratio:8\"\nrelation = \"inverse\"\n",
        )
        .unwrap();
        assert_eq!(toml_options.relation, RelationPolicy::Inverse);
        assert_eq!(toml_options.combinations().unwrap().len(), 3);

        let json_options =
            AnalysisOptions::from_json_str(r#"{"variables": ["t", "q"], "min_size": 10}"#)
                .unwrap();
        assert_eq!(json_options.variables, Some(vec!["t".into(), "q".into()]));
        assert_eq!(json_options.min_size, 10);
        assert!(json_options.resolve_constraints().is_err());
    }

    #[test]
    fn rejects_unknown_fields_and_bad_settings() {
        assert!(matches!(
            AnalysisOptions::from_yaml_str("compresor: zfp\n"),
            Err(OptionsError::Yaml(_))
        ));

        let options = AnalysisOptions {
            search: SearchOptions {
                max_depth: 0,
                ..SearchOptions::default()
            },
            ..AnalysisOptions::default()
        };
        assert!(matches!(options.settings(), Err(OptionsError::Search(_))));
        assert!(matches!(
            AnalysisOptions::from_path("options.ini"),
            Err(OptionsError::UnsupportedFormat(_))
        ));
    }
}
