use clap::Parser;

#[derive(serde::Deserialize, Debug, Clone)]
pub struct ServiceConfig {
    /// Data out pin, goes low when a conversion is ready (20)
    pub dout: u8,

    /// Serial clock pin (21)
    pub sclk: u8,

    /// Power-down / reset pin (22)
    pub pdwn: u8,

    /// Calibration record location, `cal.txt` in the working directory by
    /// default.
    pub cal_file: Option<String>,

    /// Known reference mass in grams used during calibration (5000).
    pub known_weight_g: Option<f64>,

    /// Milliseconds a read waits for the converter to signal ready before it
    /// fails. 0 waits forever.
    pub ready_timeout_ms: Option<u64>,

    /// Samples averaged per reported reading (5).
    pub read_samples: Option<usize>,

    /// Milliseconds between reported readings (500).
    pub read_interval_ms: Option<u64>,

    /// Samples averaged per calibration phase (10).
    pub calibration_samples: Option<usize>,

    /// Readings are also appended here as timestamped JSON lines when set.
    pub output_file: Option<String>,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run the two-point calibration procedure even when a stored record
    /// exists
    #[arg(short, long, default_value_t = false)]
    pub calibrate: bool,

    /// Known reference mass in grams for calibration, overrides the settings
    /// file
    #[arg(short, long)]
    pub known_weight: Option<f64>,

    /// Target configuration file, tries to read
    /// `~/.config/ads1232-scale/settings.toml` by default
    #[arg(short, long)]
    pub settings_path: Option<String>,

    /// Toggles verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
