use core::convert::Infallible;

use crate::register::Register;

/// Error type for ADS1256 operations
///
/// `E` is the SPI error type, `P` the error type of the data-ready source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E, P = Infallible> {
    /// Communication error on the SPI bus
    Communication(E),
    /// The data-ready source failed
    ReadyPin(P),
    /// The STATUS identification nibble is not the ADS1256's
    IdentityMismatch {
        /// Identification nibble that was read
        found: u8,
    },
    /// A register did not read back the value just written to it
    RegisterWriteVerificationFailed {
        /// Register that was written
        register: Register,
        /// Value that was written
        value: u8,
        /// Value read back afterwards
        readback: u8,
    },
    /// DRDY was not asserted within the configured timeout
    SignalTimeout,
    /// The operation requires a session that completed `init`
    NotInitialized,
}
