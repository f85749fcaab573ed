//! The ads1232-scale binary reads a strain-gauge load cell through an ADS1232
//! 24-bit converter and reports the calibrated weight once every 500ms. This
//! binary has only been tested on the raspberry pi.
//!
//! ## Calibrate
//! Runs the guided two-point procedure (empty cell, then a known reference
//! mass) and stores the resulting coefficients, even when a stored record
//! already exists.
//!
//! ```bash
//! ads1232-scale --calibrate --known-weight 5000
//! ```
//!
//! ## Run
//! Start a long lived process. A stored calibration is reused; when none
//! exists the calibration procedure runs first. Readings are pushed to stdout
//! and optionally appended to a file (based on given settings).
//!
//! ```bash
//! ads1232-scale # Reads settings from `~/.config/ads1232-scale/settings.toml` by default.
//!
//! ads1232-scale --help
//! ```
//!
//! ## Example config
//! ```toml
//! # ~/.config/ads1232-scale/settings.toml
//! dout = 20
//! sclk = 21
//! pdwn = 22
//! cal_file = "/var/lib/ads1232-scale/cal.txt"
//! known_weight_g = 5000
//! ready_timeout_ms = 1000
//! read_samples = 5
//! read_interval_ms = 500
//! calibration_samples = 10
//! ```

use clap::Parser;
use log::info;
use simple_logger::SimpleLogger;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{self, Write};

mod cli_config;
mod init;

use crate::cli_config::Args;
use crate::init::bootstrap;
use ads1232_scale::calibration::Calibrator;

static MODULE: &str = "ADS1232";

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    SimpleLogger::new()
        .with_level(match args.verbose {
            true => log::LevelFilter::Debug,
            false => log::LevelFilter::Info,
        })
        .init()
        .unwrap();

    let (settings, mut reader, store) = bootstrap(&args)?;

    info!("Starting ads1232-scale, setting up gpio & performing {MODULE} reset");
    reader.reset();
    info!("{MODULE} reset complete");

    let mut calibrator = Calibrator::with_known_weight(
        args.known_weight
            .or(settings.known_weight_g)
            .unwrap_or(ads1232_scale::calibration::DEFAULT_KNOWN_WEIGHT_G),
    );
    if let Some(samples) = settings.calibration_samples {
        calibrator.samples = samples;
    }

    let cal = reader.initialize(&store, &calibrator, args.calibrate)?;

    let mut sample_log = match settings.output_file {
        Some(ref path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
        None => None,
    };

    let mut stdout = io::stdout();

    reader.run_forever(
        &cal,
        &mut stdout,
        sample_log.as_mut().map(|f| f as &mut dyn Write),
    )?;

    Ok(())
}
