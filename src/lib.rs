//! Driver for the TI ADS1256 24-bit delta-sigma ADC.
//!
//! The converter is driven over SPI (mode 1) and signals finished
//! conversions on its active-low `DRDY` line. [`Ads1256`] is the blocking
//! driver, [`Ads1256Async`] the `embedded-hal-async` one. Both bring the
//! chip into a known register state with `init`, then read single-ended or
//! differential inputs as raw 24-bit codes that [`to_voltage`] turns into
//! volts.

#![no_std]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

mod asynch;
mod config;
mod driver;
mod error;
mod ready;
mod register;
mod utils;

pub use asynch::Ads1256Async;
pub use config::{Config, VerifyPolicy};
pub use driver::{Ads1256, SessionState, WriteOutcome};
pub use error::Error;
pub use ready::{AsyncDataReady, DataReady, PinReady, PolledReady, ReadyFlag};
pub use register::{
    AdconRegister, CHIP_ID, ClockOut, Command, DataRate, Gain, Input, IoRegister, MODE, Mux,
    Register, SensorDetect, StatusRegister,
};
pub use utils::{sign_extend, to_voltage};
