//! Synthetic datasets shared by the end-to-end tests.

use std::f64::consts::PI;

use dial_analyzer::{Dataset, Variable};
use ndarray::{Array1, ArrayD, IxDyn};

pub const LAT: usize = 48;
pub const LON: usize = 96;
pub const STEPS: usize = 2;

/// Minimum size used by the tests so the small fixtures are still analyzed.
pub const MIN_SIZE: usize = 1_000;

/// A smooth, temperature-like value at one grid point.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn smooth(t: usize, i: usize, j: usize) -> f64 {
    let (t, i, j) = (t as f64, i as f64, j as f64);
    let phi = PI * (i + 0.5) / LAT as f64 - PI / 2.0;
    280.0 - 25.0 * phi.sin().powi(2)
        + 3.0 * (2.0 * PI * j / LON as f64 + 0.4 * t).sin()
        + 0.8 * (4.0 * PI * i / LAT as f64).cos() * (6.0 * PI * j / LON as f64).sin()
}

/// A dataset with one of every kind of variable the analysis distinguishes.
///
/// - `temperature`: a smooth float field over `time`, `lat`, and `lon`
/// - `pressure`: a smooth `f32` field over `lat` and `lon`
/// - `gappy`: like `pressure` but with a few NaN values
/// - `mask`: an integer field
/// - `station`: a float field below the minimum size
/// - `lat`, `lon`: coordinates
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
#[must_use]
pub fn synthetic_dataset() -> Dataset {
    let lat = Array1::from_shape_fn(LAT, |i| -90.0 + 180.0 * (i as f64 + 0.5) / LAT as f64);
    let lon = Array1::from_shape_fn(LON, |j| 360.0 * j as f64 / LON as f64);

    let temperature =
        ArrayD::from_shape_fn(IxDyn(&[STEPS, LAT, LON]), |idx| smooth(idx[0], idx[1], idx[2]));
    let pressure = ArrayD::from_shape_fn(IxDyn(&[LAT, LON]), |idx| {
        (1000.0 + 4.0 * (smooth(0, idx[0], idx[1]) - 270.0)) as f32
    });
    let gappy = ArrayD::from_shape_fn(IxDyn(&[LAT, LON]), |idx| {
        if (idx[0] * LON + idx[1]) % 211 == 0 {
            f64::NAN
        } else {
            smooth(1, idx[0], idx[1])
        }
    });
    let mask = ArrayD::from_shape_fn(IxDyn(&[LAT, LON]), |idx| i64::from(idx[1] < LON / 3));
    let station = ArrayD::from_shape_fn(IxDyn(&[100]), |idx| smooth(0, idx[0] % LAT, 0));

    Dataset::new()
        .with_coordinate(variable("lat", &["lat"], lat.into_dyn()))
        .with_coordinate(variable("lon", &["lon"], lon.into_dyn()))
        .with_variable(variable("temperature", &["time", "lat", "lon"], temperature))
        .with_variable(variable("pressure", &["lat", "lon"], pressure))
        .with_variable(variable("gappy", &["lat", "lon"], gappy))
        .with_variable(variable("mask", &["lat", "lon"], mask))
        .with_variable(variable("station", &["station"], station))
}

fn variable<T>(name: &str, dims: &[&str], values: ArrayD<T>) -> Variable
where
    ArrayD<T>: Into<dial_analyzer::Values>,
{
    match Variable::new(name, dims.iter().copied(), values) {
        Ok(variable) => variable,
        Err(err) => panic!("invalid fixture: {err}"),
    }
}
