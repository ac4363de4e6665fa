//! Reading and writing per-variable encoding files.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use dial_core::Encoding;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Selection;

/// Serialization format of an encoding file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Picks the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns an error for anything other than `.yaml`, `.yml`, or `.json`.
    pub fn from_path(path: &Path) -> Result<Self, EncodingFileError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(EncodingFileError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodingFileError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid YAML encodings")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON encodings")]
    Json(#[from] serde_json::Error),

    #[error("unsupported encoding file format `{0}`")]
    UnsupportedFormat(String),
}

/// A flat mapping from variable name to encoding.
///
/// The optional `default` entry applies to variables that are not listed.
///
/// ```yaml
/// default: lossless
/// q: lossy:sz:abs:0.00012
/// t: lossy:zfp:rate:7.5
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EncodingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Encoding>,

    #[serde(flatten)]
    pub variables: BTreeMap<String, Encoding>,
}

impl EncodingConfig {
    /// Collects the selected encoding of every variable.
    #[must_use]
    pub fn from_selection(selection: &Selection) -> Self {
        Self {
            default: None,
            variables: selection.encodings.clone(),
        }
    }

    /// Returns the encoding for `variable`, falling back to the default.
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<Encoding> {
        self.variables.get(variable).copied().or(self.default)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, EncodingFileError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, EncodingFileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns an error if the text is not a mapping of encoding strings.
    pub fn from_yaml_str(text: &str) -> Result<Self, EncodingFileError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns an error if the text is not a mapping of encoding strings.
    pub fn from_json_str(text: &str) -> Result<Self, EncodingFileError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Writes the encodings to `path` in the given format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_encodings(
        &self,
        path: impl AsRef<Path>,
        format: FileFormat,
    ) -> Result<(), EncodingFileError> {
        let path = path.as_ref();
        let text = match format {
            FileFormat::Yaml => self.to_yaml()?,
            FileFormat::Json => self.to_json()?,
        };

        log::debug!("writing {} encodings to {}", self.variables.len(), path.display());
        fs::write(path, text).map_err(|source| EncodingFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads an encoding file, choosing the format from its extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EncodingFileError> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;
        let text = fs::read_to_string(path).map_err(|source| EncodingFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match format {
            FileFormat::Yaml => Self::from_yaml_str(&text),
            FileFormat::Json => Self::from_json_str(&text),
        }
    }
}
