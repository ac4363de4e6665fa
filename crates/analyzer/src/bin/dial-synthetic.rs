//! Analyzes a small synthetic dataset and prints the selected encodings.
//!
//! ```text
//! dial-synthetic [CONSTRAINTS | OPTIONS_FILE] [COMPRESSOR]
//! ```
//!
//! The first argument is either compact constraints such as
//! `correlation_I:5,ssim_I:2` or a path to a YAML, JSON, or TOML options
//! file. Set `RUST_LOG` to change the log level.

use std::{error::Error, f64::consts::PI, process::ExitCode};

use dial_analyzer::{
    AnalysisOptions, Choice, Dataset, EncodingConfig, QuantizingEmulator, Variable,
    find_optimal_encoding,
};
use log::LevelFilter;
use ndarray::{Array1, ArrayD, IxDyn};

const LAT: usize = 90;
const LON: usize = 180;
const STEPS: usize = 3;

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            let mut source = err.source();
            while let Some(cause) = source {
                log::error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);

    let mut options = match args.next() {
        Some(arg) => AnalysisOptions::from_arg(&arg)?,
        None => AnalysisOptions::default(),
    };
    if let Some(compressor) = args.next() {
        options.compressor = compressor.parse::<Choice<_>>()?;
    }

    let dataset = synthetic_dataset()?;
    let selection = find_optimal_encoding(&dataset, &options, QuantizingEmulator::default())?;

    for (variable, metrics) in &selection.metrics {
        let summary: Vec<String> = metrics
            .iter()
            .map(|(name, value)| format!("{name}={value:.3}"))
            .collect();
        log::info!("{variable}: {}", summary.join(", "));
    }

    print!("{}", EncodingConfig::from_selection(&selection).to_yaml()?);
    Ok(())
}

/// A temperature-like field over time, a field with gaps, an integer mask,
/// and the latitude and longitude coordinates.
#[allow(clippy::cast_precision_loss)]
fn synthetic_dataset() -> Result<Dataset, Box<dyn Error>> {
    let lat = Array1::from_shape_fn(LAT, |i| -89.0 + 2.0 * i as f64);
    let lon = Array1::from_shape_fn(LON, |j| 2.0 * j as f64);

    let temperature = ArrayD::from_shape_fn(IxDyn(&[STEPS, LAT, LON]), |idx| {
        let (t, i, j) = (idx[0] as f64, idx[1] as f64, idx[2] as f64);
        let phi = lat[idx[1]].to_radians();
        288.0 - 30.0 * phi.sin().powi(2)
            + 4.0 * (2.0 * PI * j / LON as f64 + 0.3 * t).sin()
            + 0.5 * (6.0 * PI * i / LAT as f64).cos()
    });

    let humidity = ArrayD::from_shape_fn(IxDyn(&[LAT, LON]), |idx| {
        let (i, j) = (idx[0], idx[1]);
        if (i * LON + j) % 97 == 0 {
            f64::NAN
        } else {
            0.01 * (1.0 + (i as f64 / 10.0).sin() * (j as f64 / 20.0).cos())
        }
    });

    let mask = ArrayD::from_shape_fn(IxDyn(&[LAT, LON]), |idx| i32::from(idx[0] < LAT / 2));

    let dataset = Dataset::new()
        .with_coordinate(Variable::new("lat", ["lat"], lat.into_dyn())?)
        .with_coordinate(Variable::new("lon", ["lon"], lon.into_dyn())?)
        .with_variable(Variable::new("temperature", ["time", "lat", "lon"], temperature)?)
        .with_variable(Variable::new("humidity", ["lat", "lon"], humidity)?)
        .with_variable(Variable::new("mask", ["lat", "lon"], mask)?);

    Ok(dataset)
}
