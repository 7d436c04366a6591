//! Blocking driver for the ADS1256

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

use crate::{
    config::{Config, VerifyPolicy},
    error::Error,
    ready::DataReady,
    register::{AdconRegister, Command, Input, Mux, Register, StatusRegister},
    utils,
};

/// Poll interval while waiting for DRDY with a timeout
const READY_POLL_US: u32 = 10;

/// Lifecycle of a driver session
///
/// A closed session no longer exists: `close` consumes the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Constructed or reset; only `init`, `reset` and `read_chip_id` are valid
    Uninitialized,
    /// `init` completed; every operation is valid
    Ready,
}

/// Result of a verified register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteOutcome {
    /// The register already held the value; nothing was written
    Unchanged,
    /// Written and read back correctly
    Verified,
    /// Written, but the register reads back something else
    Unverified {
        /// Value read back after the write
        readback: u8,
    },
}

impl WriteOutcome {
    /// Whether the register now holds the requested value
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Verified)
    }

    /// Turn an unverified write into an error
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegisterWriteVerificationFailed`] for
    /// [`WriteOutcome::Unverified`].
    pub fn verified<E, P>(self, register: Register, value: u8) -> Result<(), Error<E, P>> {
        match self {
            Self::Unchanged | Self::Verified => Ok(()),
            Self::Unverified { readback } => Err(Error::RegisterWriteVerificationFailed {
                register,
                value,
                readback,
            }),
        }
    }
}

/// ADS1256 driver instance (blocking)
///
/// Chip select belongs to the `SpiDevice`; each command sequence below is a
/// single SPI transaction. Boards that tie CS low use a device without a CS
/// pin.
#[derive(Debug)]
pub struct Ads1256<SPI, RDY, D> {
    spi: SPI,
    ready: RDY,
    delay: D,
    config: Config,
    state: SessionState,
}

impl<SPI, RDY, D, E> Ads1256<SPI, RDY, D>
where
    SPI: SpiDevice<u8, Error = E>,
    RDY: DataReady,
    D: DelayNs,
{
    /// Create a driver over an SPI device configured for [`crate::MODE`]
    ///
    /// The session starts [`SessionState::Uninitialized`]; call
    /// [`Self::init`] before reading.
    pub fn new(spi: SPI, ready: RDY, delay: D, config: Config) -> Self {
        Self {
            spi,
            ready,
            delay,
            config,
            state: SessionState::Uninitialized,
        }
    }

    /// End the session, handing back the SPI device, ready source and delay
    pub fn close(self) -> (SPI, RDY, D) {
        #[cfg(feature = "defmt")]
        defmt::debug!("Closing ADS1256 session");

        (self.spi, self.ready, self.delay)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reset, identify, program and self-calibrate the converter
    ///
    /// Registers are written through [`Self::write_register`], so values
    /// already in place are not rewritten. A readback mismatch aborts under
    /// [`VerifyPolicy::Strict`] and is only logged under
    /// [`VerifyPolicy::Lenient`].
    ///
    /// # Errors
    ///
    /// - [`Error::IdentityMismatch`] if the chip does not identify as an
    ///   ADS1256; no register is written in that case
    /// - [`Error::RegisterWriteVerificationFailed`] under the strict policy
    /// - [`Error::SignalTimeout`] if DRDY never asserts within the timeout
    /// - SPI and ready-source failures
    pub fn init(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.reset()?;

        let status = self.read_identity()?;
        if !status.is_expected_chip() {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "Unexpected chip ID {}, expected {}",
                status.id(),
                crate::CHIP_ID
            );
            return Err(Error::IdentityMismatch { found: status.id() });
        }

        let status = StatusRegister::configured(
            self.config.input_buffer,
            self.config.auto_calibration,
            false,
        );
        let adcon = AdconRegister::new(
            self.config.clock_out,
            self.config.sensor_detect,
            self.config.gain,
        );
        let baseline = [
            (Register::Status, status.0),
            (Register::Mux, Mux::RESET.bits()),
            (Register::Adcon, adcon.0),
            (Register::Drate, self.config.data_rate.bits()),
        ];

        for (register, value) in baseline {
            let outcome = self.write_register_unchecked(register, value)?;
            if self.config.verify_policy == VerifyPolicy::Strict {
                outcome.verified(register, value)?;
            }
        }

        self.calibrate()?;
        self.state = SessionState::Ready;

        #[cfg(feature = "defmt")]
        defmt::debug!("ADS1256 initialized");

        Ok(())
    }

    /// Reset all registers to their power-up values
    ///
    /// Sends RESET followed by SDATAC in one transaction so the device is
    /// not left in continuous read mode. The session becomes
    /// [`SessionState::Uninitialized`].
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication fails
    pub fn reset(&mut self) -> Result<(), Error<E, RDY::Error>> {
        #[cfg(feature = "defmt")]
        defmt::trace!("Sending RESET, SDATAC");

        self.state = SessionState::Uninitialized;
        self.spi
            .transaction(&mut [
                Operation::Write(&[Command::Reset as u8]),
                Operation::Write(&[Command::StopReadDataContinuous as u8]),
            ])
            .map_err(Error::Communication)
    }

    /// Read the identification nibble from STATUS
    ///
    /// Valid in any session state; `init` uses it as its health check.
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication fails or DRDY does not assert
    pub fn read_chip_id(&mut self) -> Result<u8, Error<E, RDY::Error>> {
        let status = self.read_identity()?;

        #[cfg(feature = "defmt")]
        defmt::debug!("Chip ID: {}", status.id());

        Ok(status.id())
    }

    /// Read one register
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails
    pub fn read_register(&mut self, register: Register) -> Result<u8, Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.read_register_unchecked(register)
    }

    /// Read and decode STATUS
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails
    pub fn read_status(&mut self) -> Result<StatusRegister, Error<E, RDY::Error>> {
        self.read_register(Register::Status).map(StatusRegister)
    }

    /// Write one register, skipping the write if it already holds `value`
    ///
    /// The register is read back after writing. A mismatch is reported as
    /// [`WriteOutcome::Unverified`] and is not retried; use
    /// [`WriteOutcome::verified`] to treat it as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails or DRDY does not assert
    pub fn write_register(
        &mut self,
        register: Register,
        value: u8,
    ) -> Result<WriteOutcome, Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.write_register_unchecked(register, value)
    }

    /// Send a single-byte command after waiting for DRDY
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails or DRDY does not assert
    pub fn issue_command(&mut self, command: Command) -> Result<(), Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.issue_command_unchecked(command)
    }

    /// Run offset and gain self-calibration and wait for it to settle
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails or DRDY does not assert
    pub fn self_calibrate(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.calibrate()
    }

    /// Enter standby mode; [`Self::wakeup`] leaves it
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails or DRDY does not assert
    pub fn standby(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.issue_command(Command::Standby)
    }

    /// Leave standby mode
    ///
    /// DRDY stays high in standby, so this does not wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails
    pub fn wakeup(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.spi
            .write(&[Command::Wakeup as u8])
            .map_err(Error::Communication)
    }

    /// Switch the multiplexer to `mux`, convert and return the raw 24-bit code
    ///
    /// MUX is written directly, without the compare and verify steps of
    /// [`Self::write_register`]. Sign interpretation is left to
    /// [`crate::sign_extend`] / [`crate::to_voltage`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails or DRDY does not assert
    pub fn read_single_ended(&mut self, mux: Mux) -> Result<u32, Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.wait_for_ready()?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Converting with MUX 0x{:02X}", mux.bits());

        let mut data = [0u8; 3];
        self.spi
            .transaction(&mut [
                Operation::Write(&Register::Mux.write_frame(mux.bits())),
                Operation::Write(&[Command::Sync as u8]),
                Operation::Write(&[Command::Wakeup as u8]),
                Operation::Write(&[Command::ReadData as u8]),
                Operation::DelayNs(self.config.command_to_read_delay_ns),
                Operation::Read(&mut data),
            ])
            .map_err(Error::Communication)?;

        let raw = utils::assemble_sample(data);

        #[cfg(feature = "defmt")]
        defmt::trace!("Raw sample: 0x{:06X}", raw);

        Ok(raw)
    }

    /// Read AIN0..AIN7 against AINCOM, in ascending order
    ///
    /// # Errors
    ///
    /// Stops at the first failing conversion, see [`Self::read_single_ended`]
    pub fn read_all_channels(&mut self) -> Result<[u32; 8], Error<E, RDY::Error>> {
        let mut samples = [0u32; 8];
        for (sample, input) in samples.iter_mut().zip(Input::PHYSICAL) {
            *sample = self.read_single_ended(Mux::single_ended(input))?;
        }
        Ok(samples)
    }

    /// Read the pairs AIN0-AIN1, AIN2-AIN3, AIN4-AIN5 and AIN6-AIN7
    ///
    /// # Errors
    ///
    /// Stops at the first failing conversion, see [`Self::read_single_ended`]
    pub fn read_differential_pairs(&mut self) -> Result<[u32; 4], Error<E, RDY::Error>> {
        let mut samples = [0u32; 4];
        for (sample, mux) in samples.iter_mut().zip(Mux::DIFFERENTIAL_PAIRS) {
            *sample = self.read_single_ended(mux)?;
        }
        Ok(samples)
    }

    /// Convert `mux` and scale the result with the configured vref and gain
    ///
    /// # Errors
    ///
    /// See [`Self::read_single_ended`]
    pub fn read_voltage(&mut self, mux: Mux) -> Result<f32, Error<E, RDY::Error>> {
        let raw = self.read_single_ended(mux)?;
        Ok(utils::to_voltage(raw, self.config.vref, self.config.gain))
    }

    fn ensure_ready(&self) -> Result<(), Error<E, RDY::Error>> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Uninitialized => Err(Error::NotInitialized),
        }
    }

    /// Block until DRDY has fallen, consuming the notification
    fn wait_for_ready(&mut self) -> Result<(), Error<E, RDY::Error>> {
        let Some(timeout_us) = self.config.ready_timeout_us else {
            while !self.ready.take_ready().map_err(Error::ReadyPin)? {
                core::hint::spin_loop();
            }
            return Ok(());
        };

        let mut waited_us = 0u32;
        loop {
            if self.ready.take_ready().map_err(Error::ReadyPin)? {
                return Ok(());
            }
            if waited_us >= timeout_us {
                #[cfg(feature = "defmt")]
                defmt::warn!("DRDY not asserted within {} us", timeout_us);
                return Err(Error::SignalTimeout);
            }
            self.delay.delay_us(READY_POLL_US);
            waited_us = waited_us.saturating_add(READY_POLL_US);
        }
    }

    fn read_identity(&mut self) -> Result<StatusRegister, Error<E, RDY::Error>> {
        self.wait_for_ready()?;
        self.read_register_unchecked(Register::Status)
            .map(StatusRegister)
    }

    fn read_register_unchecked(&mut self, register: Register) -> Result<u8, Error<E, RDY::Error>> {
        let mut value = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&register.read_frame()),
                Operation::DelayNs(self.config.command_to_read_delay_ns),
                Operation::Read(&mut value),
            ])
            .map_err(Error::Communication)?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Register {} value: 0x{:02X}", register, value[0]);

        Ok(value[0])
    }

    fn write_register_unchecked(
        &mut self,
        register: Register,
        value: u8,
    ) -> Result<WriteOutcome, Error<E, RDY::Error>> {
        let mask = register.writable_mask();

        let current = self.read_register_unchecked(register)?;
        if current & mask == value & mask {
            #[cfg(feature = "defmt")]
            defmt::trace!("Register {} already 0x{:02X}", register, current);
            return Ok(WriteOutcome::Unchanged);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Writing 0x{:02X} to register {}", value, register);

        self.wait_for_ready()?;
        self.spi
            .write(&register.write_frame(value))
            .map_err(Error::Communication)?;

        let readback = self.read_register_unchecked(register)?;
        if readback & mask == value & mask {
            Ok(WriteOutcome::Verified)
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Write to register {} failed: wrote 0x{:02X}, read 0x{:02X}",
                register,
                value,
                readback
            );
            Ok(WriteOutcome::Unverified { readback })
        }
    }

    fn issue_command_unchecked(&mut self, command: Command) -> Result<(), Error<E, RDY::Error>> {
        self.wait_for_ready()?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Sending command {}", command);

        self.spi
            .write(&[command as u8])
            .map_err(Error::Communication)
    }

    /// SELFCAL does not report completion through DRDY here, so a fixed
    /// settle time follows it
    fn calibrate(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.issue_command_unchecked(Command::SelfCalibrate)?;
        self.delay.delay_ms(self.config.calibration_settle_ms);
        Ok(())
    }
}
