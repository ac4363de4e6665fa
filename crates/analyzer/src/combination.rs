use std::{fmt, str::FromStr};

use dial_core::{Combination, Compressor, Mode, ParseError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::options::OptionsError;

const ALL: &str = "all";

/// Either every choice or one specific choice.
///
/// Parses from `"all"` or from the choice's own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice<T> {
    All,
    Only(T),
}

impl<T> Default for Choice<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Only(value) => value.fmt(f),
        }
    }
}

impl<T: FromStr<Err = ParseError>> FromStr for Choice<T> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl<T: fmt::Display> Serialize for Choice<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: FromStr<Err = ParseError>> Deserialize<'de> for Choice<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Lists the combinations to analyze.
///
/// Asking for every mode of a compressor skips the modes that cannot be
/// tuned reliably (sz3 norm2 and psnr).
///
/// # Errors
///
/// Returns an error if a mode is given without a compressor, the
/// compressor does not support the mode, or the named pair is one of the
/// unreliable modes.
pub fn enumerate(
    compressor: Choice<Compressor>,
    mode: Choice<Mode>,
) -> Result<Vec<Combination>, OptionsError> {
    let reliable = |compressor: Compressor| {
        compressor
            .modes()
            .iter()
            .filter(|mode| !mode.is_unreliable())
            .map(move |&mode| Combination { compressor, mode })
    };

    match (compressor, mode) {
        (Choice::All, Choice::All) => Ok(Compressor::ALL.into_iter().flat_map(reliable).collect()),
        (Choice::All, Choice::Only(mode)) => Err(OptionsError::ModeWithoutCompressor { mode }),
        (Choice::Only(compressor), Choice::All) => Ok(reliable(compressor).collect()),
        (Choice::Only(compressor), Choice::Only(mode)) => {
            let combination = Combination::new(compressor, mode)?;
            if mode.is_unreliable() {
                return Err(OptionsError::UnreliableMode { combination });
            }
            Ok(vec![combination])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_skips_unreliable_modes() {
        let combinations = enumerate(Choice::All, Choice::All).unwrap();
        let names: Vec<_> = combinations.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            [
                "zfp:accuracy",
                "zfp:rate",
                "zfp:precision",
                "sz:abs",
                "sz:rel",
                "sz:pw_rel",
                "sz3:abs",
                "sz3:rel",
                "sz3:pw_rel",
            ]
        );
    }

    #[test]
    fn one_compressor_lists_its_modes() {
        let combinations = enumerate(Choice::Only(Compressor::Sz3), Choice::All).unwrap();
        assert_eq!(combinations.len(), 3);
        assert!(combinations.iter().all(|c| !c.mode.is_unreliable()));
    }

    #[test]
    fn explicit_pairs_are_validated() {
        let one = enumerate(Choice::Only(Compressor::Sz3), Choice::Only(Mode::PwRel)).unwrap();
        assert_eq!(one, [Combination::new(Compressor::Sz3, Mode::PwRel).unwrap()]);

        assert!(matches!(
            enumerate(Choice::Only(Compressor::Zfp), Choice::Only(Mode::Rel)),
            Err(OptionsError::Combination(_))
        ));
        assert!(matches!(
            enumerate(Choice::All, Choice::Only(Mode::Rate)),
            Err(OptionsError::ModeWithoutCompressor { mode: Mode::Rate })
        ));
    }

    #[test]
    fn named_unreliable_modes_are_rejected() {
        for mode in [Mode::Norm2, Mode::Psnr] {
            let err = enumerate(Choice::Only(Compressor::Sz3), Choice::Only(mode)).unwrap_err();
            assert!(
                matches!(
                    err,
                    OptionsError::UnreliableMode { combination }
                        if combination == Combination::new(Compressor::Sz3, mode).unwrap()
                ),
                "{err}"
            );
        }
    }

    #[test]
    fn choices_parse_from_text() {
        assert_eq!("all".parse::<Choice<Mode>>(), Ok(Choice::All));
        assert_eq!(
            "zfp".parse::<Choice<Compressor>>(),
            Ok(Choice::Only(Compressor::Zfp))
        );
        assert!("none".parse::<Choice<Mode>>().is_err());
    }
}
