//! Bit-level access to the three converter lines: serial clock out, data out
//! (doubles as the data-ready signal) and the power-down/reset line.

use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use std::{thread, time::Duration};

/// The line primitives the converter driver is written against. Line access is
/// infallible at this layer; a wedged bus surfaces as a ready timeout in the
/// driver, never as an error here.
pub trait SignalLink {
    /// Drives the serial clock line.
    fn set_clock(&mut self, high: bool);

    /// Samples the data line, true when the line is high. The converter holds
    /// it high until a conversion is ready, then low.
    fn read_data(&self) -> bool;

    /// Drives the power-down line (low = power-down/reset).
    fn set_power(&mut self, high: bool);

    /// Blocks the calling thread for at least `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u64);
}

/// Raspberry Pi GPIO implementation of [SignalLink].
pub struct GpioLink {
    sclk: OutputPin,
    dout: InputPin,
    pdwn: OutputPin,
}

impl GpioLink {
    pub fn new(gpio: &Gpio, sclk: u8, dout: u8, pdwn: u8) -> Result<Self, rppal::gpio::Error> {
        let mut sclk = gpio.get(sclk)?.into_output();
        // Clock idles low, a high clock between reads powers the chip down.
        sclk.set_low();

        Ok(Self {
            sclk,
            dout: gpio.get(dout)?.into_input(),
            pdwn: gpio.get(pdwn)?.into_output(),
        })
    }
}

impl SignalLink for GpioLink {
    fn set_clock(&mut self, high: bool) {
        match high {
            true => self.sclk.set_high(),
            false => self.sclk.set_low(),
        }
    }

    fn read_data(&self) -> bool {
        self.dout.read() == Level::High
    }

    fn set_power(&mut self, high: bool) {
        match high {
            true => self.pdwn.set_high(),
            false => self.pdwn.set_low(),
        }
    }

    fn sleep_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}
