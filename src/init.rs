use std::{env, io, path::PathBuf, time::Duration};

use ads1232_scale::ads1232::{Ads1232, DEFAULT_READY_TIMEOUT};
use ads1232_scale::link::GpioLink;
use ads1232_scale::reader::{WeightReader, DEFAULT_READ_INTERVAL_MS, DEFAULT_READ_SAMPLES};
use ads1232_scale::store::CalibrationStore;
use config::Config;
use log::debug;
use rppal::gpio::Gpio;

use crate::cli_config::{Args, ServiceConfig};

const DEFAULT_CAL_FILE: &str = "cal.txt";

/// Reads settings from given config path or default to
/// `~/.config/ads1232-scale/settings.toml`. Then initiates the dout, sclk &
/// pdwn gpio and the calibration store.
pub fn bootstrap(
    args: &Args,
) -> Result<(ServiceConfig, WeightReader<GpioLink>, CalibrationStore), Box<dyn std::error::Error>>
{
    let settings_file = PathBuf::from(match args.settings_path.clone() {
        Some(file_path) => file_path,
        None => format!(
            "{}/.config/ads1232-scale/settings.toml",
            env::var("HOME").expect("Failed to read home dir env (HOME)")
        ),
    })
    .canonicalize()?;

    let settings = settings_file.to_str().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "Could not find settings file")
    })?;

    debug!("Trying to read settings from {}", settings);

    let settings = Config::builder()
        .add_source(config::File::with_name(settings))
        .build()?
        .try_deserialize::<ServiceConfig>()?;

    let gpio = Gpio::new()?;
    let link = GpioLink::new(&gpio, settings.sclk, settings.dout, settings.pdwn)?;

    let ready_timeout = match settings.ready_timeout_ms {
        Some(0) => None,
        Some(ms) => Some(Duration::from_millis(ms)),
        None => Some(DEFAULT_READY_TIMEOUT),
    };

    let store = CalibrationStore::new(
        settings
            .cal_file
            .clone()
            .unwrap_or_else(|| DEFAULT_CAL_FILE.to_string()),
    );

    let reader = WeightReader::with_reporting(
        Ads1232::with_ready_timeout(link, ready_timeout),
        settings.read_samples.unwrap_or(DEFAULT_READ_SAMPLES),
        settings.read_interval_ms.unwrap_or(DEFAULT_READ_INTERVAL_MS),
    );

    Ok((settings, reader, store))
}
