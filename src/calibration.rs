//! Two-point calibration: an averaged empty reading gives the offset, a known
//! reference mass gives the raw-units-per-gram scale.

use log::info;
use std::fmt::Display;
use std::thread;
use std::time::Duration;

use crate::ads1232::{Ads1232, Ads1232Error};
use crate::link::SignalLink;
use crate::store::{CalibrationStore, StoreError};

pub const DEFAULT_KNOWN_WEIGHT_G: f64 = 5000.0;

const CALIBRATION_SAMPLES: usize = 10;
const EMPTY_SETTLE_MS: u64 = 3_000;
const WEIGHTED_SETTLE_MS: u64 = 5_000;

/// Coefficients mapping raw converter units to grams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Raw reading of the empty scale.
    pub offset: f64,
    /// Raw units per gram. Never zero once a calibration run completes.
    pub scale: f64,
}

impl Calibration {
    /// Derives coefficients from the two averaged readings. A zero delta
    /// falls back to scale 1.0 instead of dividing by zero; an unloaded cell
    /// reading the same value twice is a valid, if useless, outcome.
    pub fn from_two_points(offset: f64, raw_with_weight: f64, known_weight_g: f64) -> Self {
        let delta = raw_with_weight - offset;
        let scale = match delta {
            d if d == 0.0 => 1.0,
            d => d.abs() / known_weight_g,
        };

        Self { offset, scale }
    }
}

#[derive(Debug)]
pub enum CalibrationError {
    Converter(Ads1232Error),
    Store(StoreError),
}

impl Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationError::Converter(e) => write!(f, "calibration read failed: {e}"),
            CalibrationError::Store(e) => write!(f, "calibration not persisted: {e}"),
        }
    }
}

impl std::error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalibrationError::Converter(e) => Some(e),
            CalibrationError::Store(e) => Some(e),
        }
    }
}

impl From<Ads1232Error> for CalibrationError {
    fn from(e: Ads1232Error) -> Self {
        CalibrationError::Converter(e)
    }
}

impl From<StoreError> for CalibrationError {
    fn from(e: StoreError) -> Self {
        CalibrationError::Store(e)
    }
}

/// Operator-guided two-phase procedure. Settling delays give mechanical and
/// electrical transients time to die out before the averaged samples are
/// trusted. There is no retry or cancellation inside a run; a bad run is
/// corrected by running the whole procedure again.
pub struct Calibrator {
    pub known_weight_g: f64,
    pub samples: usize,
    pub empty_settle_ms: u64,
    pub weighted_settle_ms: u64,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self {
            known_weight_g: DEFAULT_KNOWN_WEIGHT_G,
            samples: CALIBRATION_SAMPLES,
            empty_settle_ms: EMPTY_SETTLE_MS,
            weighted_settle_ms: WEIGHTED_SETTLE_MS,
        }
    }
}

impl Calibrator {
    pub fn with_known_weight(known_weight_g: f64) -> Self {
        Self {
            known_weight_g,
            ..Self::default()
        }
    }

    /// Runs both phases, persists the result and hands it back. Not durable
    /// until the save succeeds.
    pub fn run<L: SignalLink>(
        &self,
        adc: &mut Ads1232<L>,
        store: &CalibrationStore,
    ) -> Result<Calibration, CalibrationError> {
        info!("Calibration started");
        info!("1) Make the load cell EMPTY...");
        thread::sleep(Duration::from_millis(self.empty_settle_ms));

        let offset = adc.average_raw(self.samples)?;
        info!("Empty value (offset): {offset}");

        info!(
            "2) Put the known weight on the load cell: {} g",
            self.known_weight_g
        );
        thread::sleep(Duration::from_millis(self.weighted_settle_ms));

        let raw_with_weight = adc.average_raw(self.samples)?;
        info!("Raw value with weight: {raw_with_weight}");

        let cal = Calibration::from_two_points(offset, raw_with_weight, self.known_weight_g);
        info!("Calibration coefficient (scale): {}", cal.scale);

        store.save(&cal)?;
        info!("Calibration saved");

        Ok(cal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_points_give_raw_units_per_gram() {
        let cal = Calibration::from_two_points(1000.0, 2000.0, 500.0);

        assert_eq!(cal.offset, 1000.0);
        assert_eq!(cal.scale, 2.0);
    }

    #[test]
    fn scale_is_positive_for_inverted_cells() {
        let cal = Calibration::from_two_points(2000.0, 1000.0, 500.0);

        assert_eq!(cal.scale, 2.0);
    }

    #[test]
    fn zero_delta_falls_back_to_unit_scale() {
        let cal = Calibration::from_two_points(1000.0, 1000.0, 500.0);

        assert_eq!(cal.scale, 1.0);
    }
}
