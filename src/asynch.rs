//! Asynchronous driver for the ADS1256
//!
//! Same command sequences as [`crate::Ads1256`]; DRDY is awaited through an
//! [`AsyncDataReady`] source, either a latched `Signal` raised from the edge
//! handler or a [`crate::PinReady`] level wait. There is no DRDY timeout
//! inside this driver, wrap calls in the executor's timeout instead (e.g.
//! `embassy_time::with_timeout`).

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::{
    config::{Config, VerifyPolicy},
    driver::{SessionState, WriteOutcome},
    error::Error,
    ready::AsyncDataReady,
    register::{AdconRegister, Command, Input, Mux, Register, StatusRegister},
    utils,
};

/// ADS1256 driver instance (asynchronous)
#[derive(Debug)]
pub struct Ads1256Async<SPI, RDY, D> {
    spi: SPI,
    drdy: RDY,
    delay: D,
    config: Config,
    state: SessionState,
}

impl<SPI, RDY, D, E> Ads1256Async<SPI, RDY, D>
where
    SPI: SpiDevice<u8, Error = E>,
    RDY: AsyncDataReady,
    D: DelayNs,
{
    /// Create a driver over an SPI device configured for [`crate::MODE`]
    /// and a DRDY source
    pub fn new(spi: SPI, drdy: RDY, delay: D, config: Config) -> Self {
        Self {
            spi,
            drdy,
            delay,
            config,
            state: SessionState::Uninitialized,
        }
    }

    /// End the session, handing back the SPI device, DRDY source and delay
    pub fn close(self) -> (SPI, RDY, D) {
        (self.spi, self.drdy, self.delay)
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
    /// # Errors
    ///
    /// See [`crate::Ads1256::init`]
    pub async fn init(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.reset().await?;

        let status = self.read_identity().await?;
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
            let outcome = self.write_register_unchecked(register, value).await?;
            if self.config.verify_policy == VerifyPolicy::Strict {
                outcome.verified(register, value)?;
            }
        }

        self.calibrate().await?;
        self.state = SessionState::Ready;

        #[cfg(feature = "defmt")]
        defmt::debug!("ADS1256 initialized");

        Ok(())
    }

    /// Send RESET and SDATAC; the session becomes uninitialized
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication fails
    pub async fn reset(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.state = SessionState::Uninitialized;
        self.spi
            .transaction(&mut [
                Operation::Write(&[Command::Reset as u8]),
                Operation::Write(&[Command::StopReadDataContinuous as u8]),
            ])
            .await
            .map_err(Error::Communication)
    }

    /// Read the identification nibble from STATUS
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication or the DRDY source fails
    pub async fn read_chip_id(&mut self) -> Result<u8, Error<E, RDY::Error>> {
        Ok(self.read_identity().await?.id())
    }

    /// Read one register
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails
    pub async fn read_register(&mut self, register: Register) -> Result<u8, Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.read_register_unchecked(register).await
    }

    /// Read and decode STATUS
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails
    pub async fn read_status(&mut self) -> Result<StatusRegister, Error<E, RDY::Error>> {
        self.read_register(Register::Status).await.map(StatusRegister)
    }

    /// Write one register, skipping the write if it already holds `value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication or the DRDY source fails
    pub async fn write_register(
        &mut self,
        register: Register,
        value: u8,
    ) -> Result<WriteOutcome, Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.write_register_unchecked(register, value).await
    }

    /// Send a single-byte command after waiting for DRDY
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication or the DRDY source fails
    pub async fn issue_command(&mut self, command: Command) -> Result<(), Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.issue_command_unchecked(command).await
    }

    /// Run offset and gain self-calibration and wait for it to settle
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication or the DRDY source fails
    pub async fn self_calibrate(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.calibrate().await
    }

    /// Enter standby mode; [`Self::wakeup`] leaves it
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication or the DRDY source fails
    pub async fn standby(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.issue_command(Command::Standby).await
    }

    /// Leave standby mode
    ///
    /// DRDY stays high in standby, so this does not wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication fails
    pub async fn wakeup(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.spi
            .write(&[Command::Wakeup as u8])
            .await
            .map_err(Error::Communication)
    }

    /// Switch the multiplexer to `mux`, convert and return the raw 24-bit code
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init`, or an error if SPI
    /// communication or the DRDY source fails
    pub async fn read_single_ended(&mut self, mux: Mux) -> Result<u32, Error<E, RDY::Error>> {
        self.ensure_ready()?;
        self.wait_for_ready().await?;

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
            .await
            .map_err(Error::Communication)?;

        Ok(utils::assemble_sample(data))
    }

    /// Read AIN0..AIN7 against AINCOM, in ascending order
    ///
    /// # Errors
    ///
    /// Stops at the first failing conversion
    pub async fn read_all_channels(&mut self) -> Result<[u32; 8], Error<E, RDY::Error>> {
        let mut samples = [0u32; 8];
        for (sample, input) in samples.iter_mut().zip(Input::PHYSICAL) {
            *sample = self.read_single_ended(Mux::single_ended(input)).await?;
        }
        Ok(samples)
    }

    /// Read the pairs AIN0-AIN1, AIN2-AIN3, AIN4-AIN5 and AIN6-AIN7
    ///
    /// # Errors
    ///
    /// Stops at the first failing conversion
    pub async fn read_differential_pairs(&mut self) -> Result<[u32; 4], Error<E, RDY::Error>> {
        let mut samples = [0u32; 4];
        for (sample, mux) in samples.iter_mut().zip(Mux::DIFFERENTIAL_PAIRS) {
            *sample = self.read_single_ended(mux).await?;
        }
        Ok(samples)
    }

    /// Convert `mux` and scale the result with the configured vref and gain
    ///
    /// # Errors
    ///
    /// See [`Self::read_single_ended`]
    pub async fn read_voltage(&mut self, mux: Mux) -> Result<f32, Error<E, RDY::Error>> {
        let raw = self.read_single_ended(mux).await?;
        Ok(utils::to_voltage(raw, self.config.vref, self.config.gain))
    }

    fn ensure_ready(&self) -> Result<(), Error<E, RDY::Error>> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Uninitialized => Err(Error::NotInitialized),
        }
    }

    async fn wait_for_ready(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.drdy.wait_ready().await.map_err(Error::ReadyPin)
    }

    async fn read_identity(&mut self) -> Result<StatusRegister, Error<E, RDY::Error>> {
        self.wait_for_ready().await?;
        self.read_register_unchecked(Register::Status)
            .await
            .map(StatusRegister)
    }

    async fn read_register_unchecked(
        &mut self,
        register: Register,
    ) -> Result<u8, Error<E, RDY::Error>> {
        let mut value = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&register.read_frame()),
                Operation::DelayNs(self.config.command_to_read_delay_ns),
                Operation::Read(&mut value),
            ])
            .await
            .map_err(Error::Communication)?;
        Ok(value[0])
    }

    async fn write_register_unchecked(
        &mut self,
        register: Register,
        value: u8,
    ) -> Result<WriteOutcome, Error<E, RDY::Error>> {
        let mask = register.writable_mask();

        let current = self.read_register_unchecked(register).await?;
        if current & mask == value & mask {
            return Ok(WriteOutcome::Unchanged);
        }

        self.wait_for_ready().await?;
        self.spi
            .write(&register.write_frame(value))
            .await
            .map_err(Error::Communication)?;

        let readback = self.read_register_unchecked(register).await?;
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

    async fn issue_command_unchecked(
        &mut self,
        command: Command,
    ) -> Result<(), Error<E, RDY::Error>> {
        self.wait_for_ready().await?;
        self.spi
            .write(&[command as u8])
            .await
            .map_err(Error::Communication)
    }

    async fn calibrate(&mut self) -> Result<(), Error<E, RDY::Error>> {
        self.issue_command_unchecked(Command::SelfCalibrate).await?;
        self.delay.delay_ms(self.config.calibration_settle_ms).await;
        Ok(())
    }
}
