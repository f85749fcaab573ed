//! These are the internal components that are used in [ads1232-scale](../ads1232_scale/index.html)
//! to read a strain-gauge load cell through an ADS1232 24-bit converter. See, readme for usage &
//! the binary crate for setup & settings.
pub mod ads1232;
pub mod calibration;
pub mod link;
pub mod output;
pub mod reader;
pub mod store;
