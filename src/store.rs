//! File-backed persistence for the calibration coefficients. The record is a
//! single `offset,scale` line of decimal text.

use log::warn;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::calibration::Calibration;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "calibration store err={e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// A record that exists but cannot be read back as two decimal fields.
#[derive(Debug)]
struct ParseError(String);

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad calibration record: {}", self.0)
    }
}

pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns `None` when no usable record exists. A malformed record is
    /// logged and also treated as absent, so the caller recalibrates instead
    /// of taking the whole process down.
    pub fn load(&self) -> Result<Option<Calibration>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match parse_record(&content) {
            Ok(cal) => Ok(Some(cal)),
            Err(e) => {
                warn!("Discarding stored calibration ({e}), recalibration required");
                Ok(None)
            }
        }
    }

    /// Writes the record through a sibling temp file and renames it into
    /// place, so a crash never leaves a half-written record behind.
    pub fn save(&self, cal: &Calibration) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");

        fs::write(&tmp, format!("{},{}", cal.offset, cal.scale))?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

fn parse_record(content: &str) -> Result<Calibration, ParseError> {
    let mut fields = content.trim().split(',');

    let mut next_f64 = || -> Result<f64, ParseError> {
        fields
            .next()
            .ok_or_else(|| ParseError("missing field".into()))?
            .trim()
            .parse::<f64>()
            .map_err(|e| ParseError(e.to_string()))
    };

    let offset = next_f64()?;
    let scale = next_f64()?;

    if fields.next().is_some() {
        return Err(ParseError("trailing fields".into()));
    }

    Ok(Calibration { offset, scale })
}
