//! This module includes everything needed to pull signed 24-bit samples from
//! the ADS1232 and handle the different types of errors that may occur during
//! communication.

use log::trace;
use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::link::SignalLink;

const RESET_LOW_MS: u64 = 10;
const RESET_SETTLE_MS: u64 = 500;

/// How long a read waits for the data line to signal ready before giving up.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq, Eq)]
pub enum Ads1232Error {
    /// The converter never pulled the data line low within the configured
    /// ready timeout. Usually recovered by a [Ads1232::reset] and a retry.
    BusTimeout,
}

impl Display for Ads1232Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ADS1232 err={:?}", self)
    }
}

impl std::error::Error for Ads1232Error {}

/// Driver for one ADS1232 behind a [SignalLink].
pub struct Ads1232<L: SignalLink> {
    link: L,
    ready_timeout: Option<Duration>,
}

impl<L: SignalLink> Ads1232<L> {
    pub fn new(link: L) -> Self {
        Self::with_ready_timeout(link, Some(DEFAULT_READY_TIMEOUT))
    }

    /// `None` waits for ready indefinitely, matching converters wired without
    /// a reliable power-down line.
    pub fn with_ready_timeout(link: L, ready_timeout: Option<Duration>) -> Self {
        Self {
            link,
            ready_timeout,
        }
    }

    /// Power-cycles the converter: power-down line low for 10ms, back high,
    /// then 500ms for the modulator to settle. Must run once before the first
    /// read and recovers a stalled bus.
    pub fn reset(&mut self) {
        self.link.set_power(false);
        self.link.sleep_ms(RESET_LOW_MS);
        self.link.set_power(true);
        self.link.sleep_ms(RESET_SETTLE_MS);
    }

    /// Reads one conversion, MSB first, as a signed 24-bit value.
    pub fn read_raw(&mut self) -> Result<i32, Ads1232Error> {
        self.wait_ready()?;

        let mut raw: u32 = 0;
        for _ in 0..24 {
            self.link.set_clock(true);
            raw = (raw << 1) | self.link.read_data() as u32;
            self.link.set_clock(false);
        }

        // One extra pulse completes the internal conversion cycle and latches
        // the gain/channel selection for the next sample. Clocks out no data.
        self.link.set_clock(true);
        self.link.set_clock(false);

        let value = decode_i24(raw);
        trace!("raw_digital_value={value}");

        Ok(value)
    }

    /// Arithmetic mean of `n` consecutive samples.
    pub fn average_raw(&mut self, n: usize) -> Result<f64, Ads1232Error> {
        let mut sum = 0.0;

        for _ in 0..n {
            sum += self.read_raw()? as f64;
        }

        Ok(sum / n as f64)
    }

    fn wait_ready(&mut self) -> Result<(), Ads1232Error> {
        let deadline = self.ready_timeout.map(|t| Instant::now() + t);

        while self.link.read_data() {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(Ads1232Error::BusTimeout);
                }
            }
        }

        Ok(())
    }

    /// Consumes the driver, handing the underlying link back.
    pub fn into_link(self) -> L {
        self.link
    }
}

/// Two's-complement interpretation of a 24-bit word.
pub fn decode_i24(raw: u32) -> i32 {
    let raw = raw & 0xFF_FFFF;

    if raw & 0x80_0000 != 0 {
        raw as i32 - (1 << 24)
    } else {
        raw as i32
    }
}
