use std::fmt;

use thiserror::Error;

/// A compression parameter value.
///
/// Most modes take a real-valued parameter (an error bound or a bit rate).
/// Precision modes take an integer number of bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parameter {
    /// A real-valued parameter.
    Continuous(f64),

    /// An integer-valued parameter.
    Discrete(i64),
}

impl Parameter {
    /// Returns the parameter as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Continuous(value) => value,
            Self::Discrete(value) => value as f64,
        }
    }

    /// Returns `true` if the parameter is integer-valued.
    #[must_use]
    pub fn is_discrete(self) -> bool {
        matches!(self, Self::Discrete(_))
    }
}

/// Formats with three significant digits, like C's `%.3g`.
impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_significant(self.as_f64(), 3))
    }
}

/// Formats `value` with `digits` significant digits in the style of C's `%g`.
///
/// Trailing zeros are removed, and scientific notation is used when the
/// decimal exponent is below -4 or at least `digits`.
///
/// ```
/// use dial_core::format_significant;
///
/// assert_eq!(format_significant(0.30001, 3), "0.3");
/// assert_eq!(format_significant(12345.0, 3), "1.23e+04");
/// assert_eq!(format_significant(0.0000123, 3), "1.23e-05");
/// assert_eq!(format_significant(16.0, 3), "16");
/// ```
#[must_use]
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let digits = digits.max(1);

    // Round once in scientific form so the exponent reflects any carry.
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .map_or((scientific.as_str(), "0"), |(m, e)| (m, e));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let digits_i32 = digits as i32;

    if exponent < -4 || exponent >= digits_i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        #[allow(clippy::cast_sign_loss)]
        let decimals = (digits_i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// The interval a compression parameter is searched over.
///
/// The `looser` end yields the most compression and the `tighter` end the
/// highest fidelity. Either may be numerically larger: error bounds shrink
/// toward fidelity while bit rates grow toward it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterRange {
    /// A real-valued interval.
    Continuous { looser: f64, tighter: f64 },

    /// An inclusive integer interval.
    Discrete { looser: i64, tighter: i64 },
}

/// Errors that can occur when constructing a [`ParameterRange`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum RangeError {
    #[error("range bound must be finite (got {value})")]
    NonFinite { value: f64 },

    #[error("range has zero width at {value}")]
    ZeroWidth { value: f64 },
}

impl ParameterRange {
    /// Creates a validated real-valued range.
    ///
    /// # Errors
    ///
    /// Returns an error if either bound is non-finite or the bounds are equal.
    pub fn continuous(looser: f64, tighter: f64) -> Result<Self, RangeError> {
        for value in [looser, tighter] {
            if !value.is_finite() {
                return Err(RangeError::NonFinite { value });
            }
        }

        #[allow(clippy::float_cmp)]
        if looser == tighter {
            return Err(RangeError::ZeroWidth { value: looser });
        }

        Ok(Self::Continuous { looser, tighter })
    }

    /// Creates a validated inclusive integer range.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds are equal.
    #[allow(clippy::cast_precision_loss)]
    pub fn discrete(looser: i64, tighter: i64) -> Result<Self, RangeError> {
        if looser == tighter {
            return Err(RangeError::ZeroWidth {
                value: looser as f64,
            });
        }

        Ok(Self::Discrete { looser, tighter })
    }

    /// Returns the bound that yields the most compression.
    #[must_use]
    pub fn looser(&self) -> Parameter {
        match *self {
            Self::Continuous { looser, .. } => Parameter::Continuous(looser),
            Self::Discrete { looser, .. } => Parameter::Discrete(looser),
        }
    }

    /// Returns the bound that yields the highest fidelity.
    #[must_use]
    pub fn tighter(&self) -> Parameter {
        match *self {
            Self::Continuous { tighter, .. } => Parameter::Continuous(tighter),
            Self::Discrete { tighter, .. } => Parameter::Discrete(tighter),
        }
    }

    /// Returns the numerically smaller and larger bounds.
    #[must_use]
    pub fn bounds(&self) -> [f64; 2] {
        let [a, b] = [self.looser().as_f64(), self.tighter().as_f64()];
        if a <= b { [a, b] } else { [b, a] }
    }

    /// Returns the parameter a fraction `q` of the way from the smallest to
    /// the largest value in the range.
    ///
    /// Discrete ranges round to the nearest integer.
    #[must_use]
    pub fn fraction(&self, q: f64) -> Parameter {
        let [lower, upper] = self.bounds();
        let value = lower + q * (upper - lower);
        match self {
            Self::Continuous { .. } => Parameter::Continuous(value),
            #[allow(clippy::cast_possible_truncation)]
            Self::Discrete { .. } => Parameter::Discrete(value.round() as i64),
        }
    }
}
