//! Turns calibrated coefficients into a continuous weight stream: startup
//! decision (reuse the stored calibration or run the guided procedure), sample
//! averaging, and the reporting loop.

use log::{error, info, warn};
use std::fmt::Display;
use std::io;
use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::ads1232::{Ads1232, Ads1232Error};
use crate::calibration::{Calibration, CalibrationError, Calibrator};
use crate::link::SignalLink;
use crate::output::write_sample;
use crate::store::CalibrationStore;

/// Samples averaged per reported reading unless the settings say otherwise.
pub const DEFAULT_READ_SAMPLES: usize = 5;
/// Delay between reported readings unless the settings say otherwise.
pub const DEFAULT_READ_INTERVAL_MS: u64 = 500;

const RESET_RETRY_LIMIT: u32 = 3;

#[derive(Debug)]
pub enum ScaleError {
    /// A zero or non-finite scale reached weight computation. The stored
    /// record is unusable and continuous reporting must stop rather than
    /// divide by it.
    FatalConfig,
    Converter(Ads1232Error),
    Io(io::Error),
}

impl Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::FatalConfig => write!(f, "calibration scale is zero or not finite"),
            ScaleError::Converter(e) => write!(f, "converter err={e}"),
            ScaleError::Io(e) => write!(f, "output err={e}"),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::FatalConfig => None,
            ScaleError::Converter(e) => Some(e),
            ScaleError::Io(e) => Some(e),
        }
    }
}

impl From<Ads1232Error> for ScaleError {
    fn from(e: Ads1232Error) -> Self {
        ScaleError::Converter(e)
    }
}

impl From<io::Error> for ScaleError {
    fn from(e: io::Error) -> Self {
        ScaleError::Io(e)
    }
}

pub struct WeightReader<L: SignalLink> {
    adc: Ads1232<L>,
    read_samples: usize,
    read_interval_ms: u64,
}

impl<L: SignalLink> WeightReader<L> {
    pub fn new(adc: Ads1232<L>) -> Self {
        Self::with_reporting(adc, DEFAULT_READ_SAMPLES, DEFAULT_READ_INTERVAL_MS)
    }

    /// Reader with a configured per-reading sample count and reporting
    /// interval.
    pub fn with_reporting(adc: Ads1232<L>, read_samples: usize, read_interval_ms: u64) -> Self {
        Self {
            adc,
            read_samples,
            read_interval_ms,
        }
    }

    /// Power-cycles the converter, see [Ads1232::reset].
    pub fn reset(&mut self) {
        self.adc.reset();
    }

    /// Startup decision: reuse the stored calibration when one exists, run
    /// the guided procedure otherwise. `force` recalibrates regardless.
    pub fn initialize(
        &mut self,
        store: &CalibrationStore,
        calibrator: &Calibrator,
        force: bool,
    ) -> Result<Calibration, CalibrationError> {
        if !force {
            if let Some(cal) = store.load()? {
                info!(
                    "Loaded calibration offset={} scale={}",
                    cal.offset, cal.scale
                );
                return Ok(cal);
            }
        }

        calibrator.run(&mut self.adc, store)
    }

    /// Averages `samples` raw readings and applies the calibration transform.
    pub fn average_weight_g(
        &mut self,
        cal: &Calibration,
        samples: usize,
    ) -> Result<f64, ScaleError> {
        // The calibrator never produces a zero scale, but a corrupted record
        // of the right shape can get past the store's parser.
        if cal.scale == 0.0 || !cal.scale.is_finite() {
            return Err(ScaleError::FatalConfig);
        }

        let avg = self.adc.average_raw(samples)?;

        Ok((avg - cal.offset) / cal.scale)
    }

    /// One reported reading: the configured number of samples averaged and
    /// transformed to grams.
    pub fn read_weight_g(&mut self, cal: &Calibration) -> Result<f64, ScaleError> {
        self.average_weight_g(cal, self.read_samples)
    }

    /// Reports one averaged reading per interval (500ms by default) as
    /// `Weight: <v> kg`, forever. Converter timeouts trigger a reset and a
    /// retry; only a fatal configuration fault or a converter that stays dead
    /// through [RESET_RETRY_LIMIT] resets ends the loop.
    pub fn run_forever(
        &mut self,
        cal: &Calibration,
        writer: &mut dyn Write,
        mut sample_log: Option<&mut dyn Write>,
    ) -> Result<(), ScaleError> {
        let mut retries = 0;
        info!("Reading weight...");

        loop {
            match self.read_weight_g(cal) {
                Ok(grams) => {
                    retries = 0;

                    writeln!(writer, "Weight: {:.2} kg", grams / 1000.0)?;

                    if let Some(log) = sample_log.as_mut() {
                        if let Err(e) = write_sample(grams, &mut **log) {
                            warn!("Failed to append sample record: {e}");
                        }
                    }
                }
                Err(ScaleError::Converter(e)) => {
                    retries += 1;

                    if retries > RESET_RETRY_LIMIT {
                        error!("Converter did not recover after {RESET_RETRY_LIMIT} resets");
                        return Err(e.into());
                    }

                    warn!("Converter read failed ({e}), resetting ({retries}/{RESET_RETRY_LIMIT})");
                    self.adc.reset();
                    continue;
                }
                Err(e) => return Err(e),
            }

            thread::sleep(Duration::from_millis(self.read_interval_ms));
        }
    }

    /// Consumes the reader, handing the underlying link back.
    pub fn into_link(self) -> L {
        self.adc.into_link()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::testing::FakeLink;
    use std::fs;

    fn reader(samples: &[u32]) -> WeightReader<FakeLink> {
        WeightReader::new(Ads1232::new(FakeLink::new(samples)))
    }

    fn temp_store(name: &str) -> CalibrationStore {
        let path = std::env::temp_dir().join(format!(
            "ads1232-reader-{name}-{}.txt",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        CalibrationStore::new(path)
    }

    fn quick_calibrator(known_weight_g: f64, samples: usize) -> Calibrator {
        Calibrator {
            known_weight_g,
            samples,
            empty_settle_ms: 0,
            weighted_settle_ms: 0,
        }
    }

    #[test]
    fn averages_then_applies_calibration() {
        let mut reader = reader(&[1200, 1200, 1200, 1200, 1200]);
        let cal = Calibration {
            offset: 1000.0,
            scale: 2.0,
        };

        assert_eq!(reader.average_weight_g(&cal, 5).unwrap(), 100.0);
    }

    #[test]
    fn zero_scale_is_fatal_before_any_read() {
        let mut reader = reader(&[]);
        let cal = Calibration {
            offset: 0.0,
            scale: 0.0,
        };

        assert!(matches!(
            reader.average_weight_g(&cal, 5),
            Err(ScaleError::FatalConfig)
        ));
    }

    #[test]
    fn non_finite_scale_is_fatal() {
        let mut reader = reader(&[]);
        let cal = Calibration {
            offset: 0.0,
            scale: f64::NAN,
        };

        assert!(matches!(
            reader.average_weight_g(&cal, 5),
            Err(ScaleError::FatalConfig)
        ));
    }

    #[test]
    fn run_forever_halts_on_fatal_config() {
        let mut reader = reader(&[]);
        let cal = Calibration {
            offset: 0.0,
            scale: 0.0,
        };
        let mut out = Vec::new();

        assert!(matches!(
            reader.run_forever(&cal, &mut out, None),
            Err(ScaleError::FatalConfig)
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn reporting_honours_configured_sample_count() {
        let adc = Ads1232::new(FakeLink::new(&[1000, 3000]));
        let mut reader = WeightReader::with_reporting(adc, 2, 0);
        let cal = Calibration {
            offset: 0.0,
            scale: 1.0,
        };

        assert_eq!(reader.read_weight_g(&cal).unwrap(), 2000.0);
    }

    #[test]
    fn every_retry_power_cycles_the_converter() {
        let link = FakeLink::new(&[]).never_ready();
        let adc = Ads1232::with_ready_timeout(link, Some(Duration::from_millis(1)));
        let mut reader = WeightReader::new(adc);
        let cal = Calibration {
            offset: 0.0,
            scale: 1.0,
        };
        let mut out = Vec::new();

        assert!(reader.run_forever(&cal, &mut out, None).is_err());

        // Three full low/high power cycles before giving up.
        assert_eq!(reader.into_link().power_transitions.len(), 6);
    }

    #[test]
    fn run_forever_gives_up_after_reset_retries() {
        let link = FakeLink::new(&[]).never_ready();
        let adc = Ads1232::with_ready_timeout(link, Some(Duration::from_millis(1)));
        let mut reader = WeightReader::new(adc);
        let cal = Calibration {
            offset: 0.0,
            scale: 1.0,
        };
        let mut out = Vec::new();

        assert!(matches!(
            reader.run_forever(&cal, &mut out, None),
            Err(ScaleError::Converter(Ads1232Error::BusTimeout))
        ));
    }

    #[test]
    fn initialize_without_record_calibrates_and_persists() {
        // Phase one averages to 1000, phase two to 2000.
        let mut reader = reader(&[1000, 2000]);
        let store = temp_store("fresh");

        let cal = reader
            .initialize(&store, &quick_calibrator(500.0, 1), false)
            .unwrap();

        assert_eq!(
            cal,
            Calibration {
                offset: 1000.0,
                scale: 2.0
            }
        );
        assert_eq!(store.load().unwrap(), Some(cal));
    }

    #[test]
    fn initialize_reuses_stored_record_without_reading() {
        let store = temp_store("reuse");
        let stored = Calibration {
            offset: 81234.5,
            scale: 21.96,
        };
        store.save(&stored).unwrap();

        // No queued samples: any converter read would come back as zeros and
        // change the coefficients.
        let mut reader = reader(&[]);
        let cal = reader
            .initialize(&store, &quick_calibrator(500.0, 1), false)
            .unwrap();

        assert_eq!(cal, stored);
    }

    #[test]
    fn initialize_with_force_recalibrates_over_stored_record() {
        let store = temp_store("force");
        store
            .save(&Calibration {
                offset: 1.0,
                scale: 1.0,
            })
            .unwrap();

        let mut reader = reader(&[1000, 2000]);
        let cal = reader
            .initialize(&store, &quick_calibrator(500.0, 1), true)
            .unwrap();

        assert_eq!(cal.offset, 1000.0);
        assert_eq!(cal.scale, 2.0);
        assert_eq!(store.load().unwrap(), Some(cal));
    }
}
