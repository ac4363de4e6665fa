use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Combination, Compressor, Mode, Parameter, ParseError};

const LOSSLESS: &str = "lossless";
const LOSSY: &str = "lossy";

/// How a single variable should be stored.
///
/// The text form is `lossless` or `lossy:<compressor>:<mode>:<parameter>`,
/// with the parameter printed to three significant digits:
///
/// ```
/// use dial_core::{Compressor, Encoding, Mode, Parameter};
///
/// let encoding = Encoding::Lossy {
///     compressor: Compressor::Sz,
///     mode: Mode::Abs,
///     parameter: Parameter::Continuous(0.012_345),
/// };
/// assert_eq!(encoding.to_string(), "lossy:sz:abs:0.0123");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    Lossless,
    Lossy {
        compressor: Compressor,
        mode: Mode,
        parameter: Parameter,
    },
}

impl Encoding {
    /// Creates a lossy encoding for a combination.
    #[must_use]
    pub fn lossy(combination: Combination, parameter: Parameter) -> Self {
        Self::Lossy {
            compressor: combination.compressor,
            mode: combination.mode,
            parameter,
        }
    }

    /// Returns the compressor and mode, or `None` for lossless.
    #[must_use]
    pub fn combination(&self) -> Option<Combination> {
        match *self {
            Self::Lossless => None,
            Self::Lossy {
                compressor, mode, ..
            } => Some(Combination { compressor, mode }),
        }
    }

    /// Returns `true` for [`Encoding::Lossless`].
    #[must_use]
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Lossless)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lossless => f.write_str(LOSSLESS),
            Self::Lossy {
                compressor,
                mode,
                parameter,
            } => write!(f, "{LOSSY}:{compressor}:{mode}:{parameter}"),
        }
    }
}

impl FromStr for Encoding {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text == LOSSLESS {
            return Ok(Self::Lossless);
        }

        let parts: Vec<&str> = text.split(':').collect();
        let [LOSSY, compressor, mode, parameter] = parts.as_slice() else {
            return Err(ParseError::MalformedEncoding(s.to_string()));
        };

        let combination = Combination::new(compressor.parse()?, mode.parse()?)?;
        let invalid = || ParseError::InvalidParameter((*parameter).to_string());

        let parameter = if combination.mode.is_discrete() {
            // Accept `16` as well as `16.0` or `1.6e+01`.
            let value: f64 = parameter.parse().map_err(|_| invalid())?;
            if !value.is_finite() || value.fract() != 0.0 {
                return Err(invalid());
            }
            #[allow(clippy::cast_possible_truncation)]
            Parameter::Discrete(value as i64)
        } else {
            let value: f64 = parameter.parse().map_err(|_| invalid())?;
            if !value.is_finite() {
                return Err(invalid());
            }
            Parameter::Continuous(value)
        };

        Ok(Self::lossy(combination, parameter))
    }
}

impl Serialize for Encoding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
