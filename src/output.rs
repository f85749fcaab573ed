//! Relays readings as timestamped JSON lines to an auxiliary writer,
//! typically an append-only file consumed by another process. Note that this
//! module (and the entire process) assume the metric system.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::io::Write;

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Sample {
    /// Time of sample creation
    pub datetime: DateTime<Utc>,

    /// Weight at the given sample time
    pub grams: f64,
}

/// Appends one reading to the given writer, one JSON object per line.
pub fn write_sample(grams: f64, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let sample = Sample {
        grams,
        datetime: Utc::now(),
    };

    writeln!(writer, "{}", serde_json::to_string(&sample)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_serialize_one_per_line() {
        let mut out = Vec::new();

        write_sample(100.5, &mut out).unwrap();
        write_sample(99.0, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        let first: Sample = serde_json::from_str(lines.next().unwrap()).unwrap();
        let second: Sample = serde_json::from_str(lines.next().unwrap()).unwrap();

        assert_eq!(first.grams, 100.5);
        assert_eq!(second.grams, 99.0);
        assert!(lines.next().is_none());
    }
}
