//! A self-contained emulator standing in for external compressor backends.
//!
//! Each mode is modeled by a quantizer that honors the mode's parameter the
//! way the real compressor does (an absolute, relative, or point-wise bound,
//! a bit budget, or a count of kept mantissa bits). The quantized codes are
//! delta encoded at the width of the source element type and compressed with
//! Zstandard, and the ratio reflects the actual compressed size against the
//! stored size. Decompression runs the whole pipeline in reverse.

use std::{collections::BTreeSet, io::Write};

use dial_core::{
    Combination, Compressor, Emulation, EmulationError, Emulator, FloatType, Mode, Parameter,
};
use ndarray::{ArrayD, ArrayViewD};
use zstd::stream::{Decoder, Encoder};

/// Default Zstandard compression level.
pub const DEFAULT_LEVEL: i32 = 3;

/// Largest code magnitude a uniform quantizer may produce before the data is
/// stored exactly instead: one level per representable step of the
/// significand.
fn max_uniform_levels(float_type: FloatType) -> f64 {
    f64::from(float_type.mantissa_bits() - 1).exp2()
}

/// Emulates zfp, sz, and sz3 with quantization followed by Zstandard.
///
/// Compressors not in the available set report
/// [`EmulationError::Unavailable`], as do the sz3 norm2 and psnr modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizingEmulator {
    available: BTreeSet<Compressor>,
    level: i32,
}

impl Default for QuantizingEmulator {
    fn default() -> Self {
        Self::new(Compressor::ALL)
    }
}

impl QuantizingEmulator {
    /// Creates an emulator for the given compressors.
    pub fn new(compressors: impl IntoIterator<Item = Compressor>) -> Self {
        Self {
            available: compressors.into_iter().collect(),
            level: DEFAULT_LEVEL,
        }
    }

    /// Sets the Zstandard level used for the entropy stage.
    #[must_use]
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Returns `true` if `compressor` can be emulated.
    #[must_use]
    pub fn is_available(&self, compressor: Compressor) -> bool {
        self.available.contains(&compressor)
    }
}

impl Emulator for QuantizingEmulator {
    fn compress_and_decompress(
        &self,
        data: ArrayViewD<'_, f64>,
        float_type: FloatType,
        combination: Combination,
        parameter: Parameter,
    ) -> Result<Emulation, EmulationError> {
        if !self.is_available(combination.compressor)
            || !combination.compressor.supports(combination.mode)
            || combination.mode.is_unreliable()
        {
            return Err(EmulationError::Unavailable { combination });
        }

        let quantizer = Quantizer::new(combination.mode, parameter, float_type, data.view())
            .ok_or(EmulationError::InvalidParameter {
                combination,
                parameter,
            })?;

        let codes: Vec<i64> = data.iter().map(|&x| quantizer.encode(x)).collect();
        let compressed = compress(&codes, float_type, self.level)?;
        let decoded = decompress(&compressed, codes.len(), float_type)?;

        let values = decoded
            .into_iter()
            .map(|c| float_type.round(quantizer.decode(c)))
            .collect();
        let reconstructed = ArrayD::from_shape_vec(data.raw_dim(), values)
            .map_err(|e| EmulationError::Backend(Box::new(e)))?;

        #[allow(clippy::cast_precision_loss)]
        let compression_ratio =
            (codes.len() * float_type.size()) as f64 / compressed.len().max(1) as f64;

        Ok(Emulation {
            reconstructed,
            compression_ratio,
        })
    }
}

/// Maps values to integer codes and back.
///
/// Codes of `f32` data always fit in an `i32`, so they can be written as
/// 4-byte words.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Quantizer {
    /// Stores the bit pattern of the stored type unchanged.
    Exact(FloatType),

    /// Rounds to the nearest multiple of `step` from `origin`.
    Uniform { origin: f64, step: f64 },

    /// Rounds `ln|x|` to the nearest multiple of `step`, keeping the sign.
    Logarithmic { step: f64 },

    /// Rounds away the lowest `drop` bits of the IEEE 754 representation.
    Mantissa { float_type: FloatType, drop: u32 },
}

impl Quantizer {
    /// Builds the quantizer for a mode and parameter, or `None` if the
    /// parameter is out of range for the mode.
    fn new(
        mode: Mode,
        parameter: Parameter,
        float_type: FloatType,
        data: ArrayViewD<'_, f64>,
    ) -> Option<Self> {
        let p = parameter.as_f64();
        if !p.is_finite() || p < 0.0 {
            return None;
        }

        let (min, max) = data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (origin, range) = if min.is_finite() && max.is_finite() {
            (min, max - min)
        } else {
            (0.0, 0.0)
        };
        let uniform = |step: f64| Self::uniform(float_type, origin, range, step);

        let quantizer = match mode {
            Mode::Accuracy | Mode::Abs => uniform(2.0 * p),
            Mode::Rel => uniform(2.0 * p * range),
            Mode::PwRel if p < float_type.epsilon() => Self::Exact(float_type),
            Mode::PwRel => Self::Logarithmic {
                step: 2.0 * p.ln_1p(),
            },
            Mode::Rate => {
                if p < 1.0 {
                    return None;
                }
                let levels = p.exp2();
                uniform(range / (levels - 1.0))
            }
            Mode::Precision => {
                let bits = float_type.mantissa_bits();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let kept = p.round().clamp(1.0, f64::from(bits)) as u32;
                match bits - kept {
                    0 => Self::Exact(float_type),
                    drop => Self::Mantissa { float_type, drop },
                }
            }
            Mode::Norm2 | Mode::Psnr => return None,
        };

        Some(quantizer)
    }

    fn uniform(float_type: FloatType, origin: f64, range: f64, step: f64) -> Self {
        if range == 0.0 {
            return Self::Uniform { origin, step: 1.0 };
        }
        if step <= 0.0 || !step.is_finite() || range / step > max_uniform_levels(float_type) {
            return Self::Exact(float_type);
        }
        Self::Uniform { origin, step }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    fn encode(self, x: f64) -> i64 {
        match self {
            Self::Exact(FloatType::F64) => x.to_bits() as i64,
            Self::Exact(FloatType::F32) => i64::from((x as f32).to_bits() as i32),
            Self::Uniform { origin, step } => ((x - origin) / step).round() as i64,
            Self::Logarithmic { .. } if x == 0.0 => 0,
            Self::Logarithmic { step } => {
                let k = (x.abs().ln() / step).round() as i64;
                let negative = i64::from(x < 0.0);
                4 * k + 2 * negative + 1
            }
            Self::Mantissa {
                float_type: FloatType::F64,
                drop,
            } => {
                let half = 1_u64 << (drop - 1);
                (x.to_bits().wrapping_add(half) >> drop) as i64
            }
            Self::Mantissa {
                float_type: FloatType::F32,
                drop,
            } => {
                let half = 1_u32 << (drop - 1);
                i64::from(((x as f32).to_bits().wrapping_add(half) >> drop) as i32)
            }
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn decode(self, code: i64) -> f64 {
        match self {
            Self::Exact(FloatType::F64) => f64::from_bits(code as u64),
            Self::Exact(FloatType::F32) => f64::from(f32::from_bits(code as u32)),
            Self::Uniform { origin, step } => origin + code as f64 * step,
            Self::Logarithmic { .. } if code == 0 => 0.0,
            Self::Logarithmic { step } => {
                let negative = ((code - 1) >> 1) & 1;
                let k = (code - 1 - 2 * negative) / 4;
                let magnitude = (k as f64 * step).exp();
                if negative == 1 { -magnitude } else { magnitude }
            }
            Self::Mantissa {
                float_type: FloatType::F64,
                drop,
            } => f64::from_bits((code as u64) << drop),
            Self::Mantissa {
                float_type: FloatType::F32,
                drop,
            } => f64::from(f32::from_bits((code as u32) << drop)),
        }
    }
}

fn backend(error: std::io::Error) -> EmulationError {
    EmulationError::Backend(Box::new(error))
}

/// Delta and zigzag encodes the codes as words of the stored width, then
/// compresses them with Zstandard.
#[allow(clippy::cast_possible_truncation)]
fn compress(
    codes: &[i64],
    float_type: FloatType,
    level: i32,
) -> Result<Vec<u8>, EmulationError> {
    let mut bytes = Vec::with_capacity(codes.len() * float_type.size());
    let mut previous = 0_i64;
    for &code in codes {
        let delta = code.wrapping_sub(previous);
        previous = code;
        match float_type {
            FloatType::F64 => bytes.extend_from_slice(&zigzag(delta).to_le_bytes()),
            FloatType::F32 => bytes.extend_from_slice(&zigzag32(delta as i32).to_le_bytes()),
        }
    }

    let mut encoder = Encoder::new(Vec::new(), level).map_err(backend)?;
    encoder.write_all(&bytes).map_err(backend)?;
    encoder.finish().map_err(backend)
}

/// Reverses [`compress`].
fn decompress(
    compressed: &[u8],
    len: usize,
    float_type: FloatType,
) -> Result<Vec<i64>, EmulationError> {
    let width = float_type.size();
    let mut decoder = Decoder::new(compressed).map_err(backend)?;
    let mut bytes = Vec::with_capacity(len * width);
    std::io::copy(&mut decoder, &mut bytes).map_err(backend)?;

    if bytes.len() != len * width {
        return Err(backend(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len * width, bytes.len()),
        )));
    }

    let codes = match float_type {
        FloatType::F64 => {
            let mut previous = 0_i64;
            bytes
                .chunks_exact(width)
                .map(|chunk| {
                    let mut word = [0_u8; 8];
                    word.copy_from_slice(chunk);
                    previous = previous.wrapping_add(unzigzag(u64::from_le_bytes(word)));
                    previous
                })
                .collect()
        }
        FloatType::F32 => {
            let mut previous = 0_i32;
            bytes
                .chunks_exact(width)
                .map(|chunk| {
                    let mut word = [0_u8; 4];
                    word.copy_from_slice(chunk);
                    previous = previous.wrapping_add(unzigzag32(u32::from_le_bytes(word)));
                    i64::from(previous)
                })
                .collect()
        }
    };
    Ok(codes)
}

#[allow(clippy::cast_sign_loss)]
fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[allow(clippy::cast_possible_wrap)]
fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[allow(clippy::cast_sign_loss)]
fn zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[allow(clippy::cast_possible_wrap)]
fn unzigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::IxDyn;

    fn field(n: usize) -> ArrayD<f64> {
        #[allow(clippy::cast_precision_loss)]
        ArrayD::from_shape_fn(IxDyn(&[n]), |idx| {
            let x = idx[0] as f64 / 50.0;
            10.0 * x.sin() + 0.5 * (7.0 * x).cos() + 20.0
        })
    }

    fn combination(compressor: Compressor, mode: Mode) -> Combination {
        Combination::new(compressor, mode).unwrap()
    }

    /// Finite `f32` values with uniformly random bit patterns.
    fn f32_noise(n: usize) -> ArrayD<f64> {
        let mut state = 0x2545_f491_u32;
        ArrayD::from_shape_simple_fn(IxDyn(&[n]), || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            // Clear one exponent bit so the value is never NaN or infinite.
            let bits = if (state >> 23) & 0xff == 0xff {
                state & !(1 << 23)
            } else {
                state
            };
            f64::from(f32::from_bits(bits))
        })
    }

    fn max_error(a: &ArrayD<f64>, b: &ArrayD<f64>) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
    }

    #[test]
    fn absolute_bound_is_honored() {
        let data = field(5000);
        let emulator = QuantizingEmulator::default();

        for bound in [1.0, 0.1, 0.001] {
            let out = emulator
                .compress_and_decompress(
                    data.view(),
                    FloatType::F64,
                    combination(Compressor::Sz, Mode::Abs),
                    Parameter::Continuous(bound),
                )
                .unwrap();
            assert!(max_error(&data, &out.reconstructed) <= bound * (1.0 + 1e-9));
        }
    }

    #[test]
    fn looser_bounds_compress_more() {
        let data = field(5000);
        let emulator = QuantizingEmulator::default();
        let accuracy = combination(Compressor::Zfp, Mode::Accuracy);

        let ratio = |bound: f64| {
            emulator
                .compress_and_decompress(
                    data.view(),
                    FloatType::F64,
                    accuracy,
                    Parameter::Continuous(bound),
                )
                .unwrap()
                .compression_ratio
        };

        assert!(ratio(1.0) > ratio(0.01));
        assert!(ratio(0.01) > ratio(0.000_01));
    }

    #[test]
    fn pointwise_relative_bound_is_honored() {
        let data = field(2000).mapv(|v| v - 20.0);
        let out = QuantizingEmulator::default()
            .compress_and_decompress(
                data.view(),
                FloatType::F64,
                combination(Compressor::Sz3, Mode::PwRel),
                Parameter::Continuous(0.01),
            )
            .unwrap();

        for (x, y) in data.iter().zip(out.reconstructed.iter()) {
            if *x == 0.0 {
                assert_eq!(*y, 0.0);
            } else {
                assert!(((y - x) / x).abs() <= 0.01 + 1e-12, "{x} -> {y}");
            }
        }
    }

    #[test]
    fn precision_keeps_leading_bits() {
        let data = field(1000);
        let out = QuantizingEmulator::default()
            .compress_and_decompress(
                data.view(),
                FloatType::F64,
                combination(Compressor::Zfp, Mode::Precision),
                Parameter::Discrete(12),
            )
            .unwrap();

        for (x, y) in data.iter().zip(out.reconstructed.iter()) {
            assert!(((y - x) / x).abs() <= 2.0_f64.powi(-11));
        }
    }

    #[test]
    fn full_precision_is_exact() {
        let data = field(1000);
        let out = QuantizingEmulator::default()
            .compress_and_decompress(
                data.view(),
                FloatType::F64,
                combination(Compressor::Zfp, Mode::Precision),
                Parameter::Discrete(53),
            )
            .unwrap();
        assert_eq!(out.reconstructed, data);
    }

    #[test]
    fn exact_f32_noise_does_not_compress() {
        let data = f32_noise(20_000);
        let emulator = QuantizingEmulator::default();
        let exact = combination(Compressor::Sz, Mode::Abs);

        let f32_out = emulator
            .compress_and_decompress(
                data.view(),
                FloatType::F32,
                exact,
                Parameter::Continuous(0.0),
            )
            .unwrap();
        assert_eq!(f32_out.reconstructed, data);
        assert!(
            (0.9..1.1).contains(&f32_out.compression_ratio),
            "ratio {}",
            f32_out.compression_ratio
        );

        // The same values widened to f64 carry 29 zero bits each.
        let f64_out = emulator
            .compress_and_decompress(
                data.view(),
                FloatType::F64,
                exact,
                Parameter::Continuous(0.0),
            )
            .unwrap();
        assert_eq!(f64_out.reconstructed, data);
        assert!(f64_out.compression_ratio > 1.5 * f32_out.compression_ratio);
    }

    #[test]
    fn f32_reconstruction_is_representable() {
        #[allow(clippy::cast_possible_truncation)]
        let data = field(3000).mapv(|v| f64::from(v as f32));
        let emulator = QuantizingEmulator::default();

        for (compressor, mode, parameter) in [
            (Compressor::Sz, Mode::Abs, Parameter::Continuous(0.01)),
            (Compressor::Sz3, Mode::PwRel, Parameter::Continuous(0.001)),
            (Compressor::Zfp, Mode::Rate, Parameter::Continuous(12.0)),
        ] {
            let out = emulator
                .compress_and_decompress(
                    data.view(),
                    FloatType::F32,
                    combination(compressor, mode),
                    parameter,
                )
                .unwrap();
            for &y in &out.reconstructed {
                assert_eq!(FloatType::F32.round(y), y);
            }
            assert!(out.compression_ratio > 1.0, "{mode}: {}", out.compression_ratio);
        }

        let full = emulator
            .compress_and_decompress(
                data.view(),
                FloatType::F32,
                combination(Compressor::Zfp, Mode::Precision),
                Parameter::Discrete(32),
            )
            .unwrap();
        assert_eq!(full.reconstructed, data);
    }

    #[test]
    fn unavailable_backends_and_modes() {
        let data = field(100);
        let zfp_only = QuantizingEmulator::new([Compressor::Zfp]);

        let missing = zfp_only.compress_and_decompress(
            data.view(),
            FloatType::F64,
            combination(Compressor::Sz, Mode::Abs),
            Parameter::Continuous(0.1),
        );
        assert!(matches!(missing, Err(EmulationError::Unavailable { .. })));

        let psnr = QuantizingEmulator::default().compress_and_decompress(
            data.view(),
            FloatType::F64,
            combination(Compressor::Sz3, Mode::Psnr),
            Parameter::Continuous(40.0),
        );
        assert!(matches!(psnr, Err(EmulationError::Unavailable { .. })));
    }

    #[test]
    fn rejects_negative_parameters() {
        let data = field(100);
        let result = QuantizingEmulator::default().compress_and_decompress(
            data.view(),
            FloatType::F64,
            combination(Compressor::Sz, Mode::Rel),
            Parameter::Continuous(-0.1),
        );
        assert!(matches!(result, Err(EmulationError::InvalidParameter { .. })));
    }

    #[test]
    fn zigzag_handles_extremes() {
        for value in [0, 1, -1, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag(zigzag(value)), value);
        }
        for value in [0, 1, -1, i32::MAX, i32::MIN] {
            assert_eq!(unzigzag32(zigzag32(value)), value);
        }
    }
}
