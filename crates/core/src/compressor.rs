use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A lossy compressor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compressor {
    Zfp,
    Sz,
    Sz3,
}

/// The meaning of a compressor's parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Absolute error bound (zfp).
    Accuracy,
    /// Bits per value (zfp).
    Rate,
    /// Bits of precision kept per value (zfp).
    Precision,
    /// Absolute error bound (sz, sz3).
    Abs,
    /// Error bound relative to the value range (sz, sz3).
    Rel,
    /// Point-wise relative error bound (sz, sz3).
    PwRel,
    /// L2-norm error bound (sz3).
    Norm2,
    /// Target peak signal-to-noise ratio (sz3).
    Psnr,
}

/// Errors that can occur when parsing compressor, mode, or encoding text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown compressor `{0}`")]
    UnknownCompressor(String),

    #[error("unknown mode `{0}`")]
    UnknownMode(String),

    #[error("compressor {compressor} does not support mode {mode}")]
    UnsupportedCombination { compressor: Compressor, mode: Mode },

    #[error("malformed encoding `{0}`")]
    MalformedEncoding(String),

    #[error("invalid parameter `{0}`")]
    InvalidParameter(String),
}

impl Compressor {
    /// Every known compressor, in enumeration order.
    pub const ALL: [Self; 3] = [Self::Zfp, Self::Sz, Self::Sz3];

    /// Returns the lowercase compressor name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Zfp => "zfp",
            Self::Sz => "sz",
            Self::Sz3 => "sz3",
        }
    }

    /// Returns the modes this compressor accepts, in enumeration order.
    #[must_use]
    pub fn modes(self) -> &'static [Mode] {
        match self {
            Self::Zfp => &[Mode::Accuracy, Mode::Rate, Mode::Precision],
            Self::Sz => &[Mode::Abs, Mode::Rel, Mode::PwRel],
            Self::Sz3 => &[Mode::Abs, Mode::Rel, Mode::PwRel, Mode::Norm2, Mode::Psnr],
        }
    }

    /// Returns `true` if this compressor accepts `mode`.
    #[must_use]
    pub fn supports(self, mode: Mode) -> bool {
        self.modes().contains(&mode)
    }
}

impl Mode {
    /// Modes left out of automatic enumeration because their parameter
    /// cannot be tuned reliably by bisection.
    pub const UNRELIABLE: [Self; 2] = [Self::Norm2, Self::Psnr];

    /// Returns the lowercase mode name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Rate => "rate",
            Self::Precision => "precision",
            Self::Abs => "abs",
            Self::Rel => "rel",
            Self::PwRel => "pw_rel",
            Self::Norm2 => "norm2",
            Self::Psnr => "psnr",
        }
    }

    /// Returns `true` if the mode takes an integer parameter.
    #[must_use]
    pub fn is_discrete(self) -> bool {
        matches!(self, Self::Precision)
    }

    /// Returns `true` if the mode is excluded from automatic enumeration.
    #[must_use]
    pub fn is_unreliable(self) -> bool {
        Self::UNRELIABLE.contains(&self)
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compressor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| ParseError::UnknownCompressor(s.to_string()))
    }
}

impl FromStr for Mode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accuracy" => Ok(Self::Accuracy),
            "rate" => Ok(Self::Rate),
            "precision" => Ok(Self::Precision),
            "abs" => Ok(Self::Abs),
            "rel" => Ok(Self::Rel),
            "pw_rel" => Ok(Self::PwRel),
            "norm2" => Ok(Self::Norm2),
            "psnr" => Ok(Self::Psnr),
            other => Err(ParseError::UnknownMode(other.to_string())),
        }
    }
}

/// A compressor paired with one of its modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Combination {
    pub compressor: Compressor,
    pub mode: Mode,
}

impl Combination {
    /// Creates a combination, checking that the compressor accepts the mode.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnsupportedCombination`] if it does not.
    pub fn new(compressor: Compressor, mode: Mode) -> Result<Self, ParseError> {
        if compressor.supports(mode) {
            Ok(Self { compressor, mode })
        } else {
            Err(ParseError::UnsupportedCombination { compressor, mode })
        }
    }
}

/// Formats as `<compressor>:<mode>`.
impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.compressor, self.mode)
    }
}

impl FromStr for Combination {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (compressor, mode) = s
            .split_once(':')
            .ok_or_else(|| ParseError::MalformedEncoding(s.to_string()))?;
        Self::new(compressor.parse()?, mode.parse()?)
    }
}
