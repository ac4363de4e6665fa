use ndarray::{ArrayD, ArrayViewD};
use thiserror::Error;

use crate::{Combination, Parameter};

/// The element type data is stored as, which fixes its uncompressed size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FloatType {
    F32,
    #[default]
    F64,
}

impl FloatType {
    /// Bytes per stored value.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::F32 => size_of::<f32>(),
            Self::F64 => size_of::<f64>(),
        }
    }

    /// Significand bits, including the implicit leading bit.
    #[must_use]
    pub const fn mantissa_bits(self) -> u32 {
        match self {
            Self::F32 => f32::MANTISSA_DIGITS,
            Self::F64 => f64::MANTISSA_DIGITS,
        }
    }

    #[must_use]
    pub const fn epsilon(self) -> f64 {
        match self {
            Self::F32 => f32::EPSILON as f64,
            Self::F64 => f64::EPSILON,
        }
    }

    /// Rounds `value` to the nearest value this type can store.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn round(self, value: f64) -> f64 {
        match self {
            Self::F32 => f64::from(value as f32),
            Self::F64 => value,
        }
    }
}

/// The outcome of compressing and decompressing data in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Emulation {
    /// The data as it would read back after decompression.
    pub reconstructed: ArrayD<f64>,

    /// Uncompressed size, at the source element width, divided by
    /// compressed size.
    pub compression_ratio: f64,
}

/// Errors an [`Emulator`] can report.
#[derive(Debug, Error)]
pub enum EmulationError {
    /// The backend for this combination is not available.
    #[error("{combination} is not available")]
    Unavailable { combination: Combination },

    #[error("invalid parameter {parameter} for {combination}")]
    InvalidParameter {
        combination: Combination,
        parameter: Parameter,
    },

    #[error("compression backend failed")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Compresses then decompresses data without touching storage.
///
/// Implementations must be deterministic: the same data, combination, and
/// parameter always yield the same reconstruction and ratio.
pub trait Emulator {
    /// Round-trips `data`, stored as `float_type`, through the compressor.
    ///
    /// `data` is always widened to `f64`; `float_type` gives the width the
    /// compressor actually sees, and the reconstruction is representable in
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::Unavailable`] if the combination cannot be
    /// emulated, or another variant if the round trip fails.
    fn compress_and_decompress(
        &self,
        data: ArrayViewD<'_, f64>,
        float_type: FloatType,
        combination: Combination,
        parameter: Parameter,
    ) -> Result<Emulation, EmulationError>;
}

impl<E: Emulator + ?Sized> Emulator for &E {
    fn compress_and_decompress(
        &self,
        data: ArrayViewD<'_, f64>,
        float_type: FloatType,
        combination: Combination,
        parameter: Parameter,
    ) -> Result<Emulation, EmulationError> {
        (**self).compress_and_decompress(data, float_type, combination, parameter)
    }
}
