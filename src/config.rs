//! Session configuration applied by `init`.

use crate::register::{ClockOut, DataRate, Gain, SensorDetect};

/// How `init` treats a register that does not read back what was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerifyPolicy {
    /// Abort `init` with `Error::RegisterWriteVerificationFailed`
    #[default]
    Strict,
    /// Log the mismatch and continue with whatever the device holds
    Lenient,
}

/// Converter settings and driver timing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// PGA setting programmed into ADCON
    pub gain: Gain,
    /// Data rate programmed into DRATE
    pub data_rate: DataRate,
    /// STATUS.BUFEN
    pub input_buffer: bool,
    /// STATUS.ACAL
    pub auto_calibration: bool,
    /// D0/CLKOUT setting programmed into ADCON
    pub clock_out: ClockOut,
    /// Sensor detect current programmed into ADCON
    pub sensor_detect: SensorDetect,
    /// Reference voltage used by the voltage helpers
    pub vref: f32,
    /// Time allowed for self-calibration after SELFCAL, in milliseconds
    pub calibration_settle_ms: u32,
    /// Pause between an RREG/RDATA command and clocking out its data (t6),
    /// in nanoseconds
    pub command_to_read_delay_ns: u32,
    /// Give up waiting for DRDY after this many microseconds; `None` waits
    /// forever
    ///
    /// With a timeout the ready source is sampled every 10 µs. That suits
    /// `&ReadyFlag`, which latches edges, and `PolledReady`, which reacts to
    /// the low level rather than the sub-microsecond DRDY pulse. A source
    /// that only reports edges it samples itself would miss that pulse.
    pub ready_timeout_us: Option<u32>,
    /// What `init` does when a register reads back a different value
    pub verify_policy: VerifyPolicy,
}

impl Config {
    /// t6 = 50 master clock periods at 7.68 MHz
    pub const DEFAULT_COMMAND_TO_READ_DELAY_NS: u32 = 6_510;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            gain: Gain::X64,
            data_rate: DataRate::Sps1000,
            input_buffer: true,
            auto_calibration: false,
            clock_out: ClockOut::Off,
            sensor_detect: SensorDetect::Off,
            vref: 2.5,
            calibration_settle_ms: 40,
            command_to_read_delay_ns: Self::DEFAULT_COMMAND_TO_READ_DELAY_NS,
            ready_timeout_us: None,
            verify_policy: VerifyPolicy::Strict,
        }
    }

    #[must_use]
    pub const fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    #[must_use]
    pub const fn with_data_rate(mut self, data_rate: DataRate) -> Self {
        self.data_rate = data_rate;
        self
    }

    #[must_use]
    pub const fn with_input_buffer(mut self, enabled: bool) -> Self {
        self.input_buffer = enabled;
        self
    }

    #[must_use]
    pub const fn with_auto_calibration(mut self, enabled: bool) -> Self {
        self.auto_calibration = enabled;
        self
    }

    #[must_use]
    pub const fn with_clock_out(mut self, clock_out: ClockOut) -> Self {
        self.clock_out = clock_out;
        self
    }

    #[must_use]
    pub const fn with_sensor_detect(mut self, sensor_detect: SensorDetect) -> Self {
        self.sensor_detect = sensor_detect;
        self
    }

    #[must_use]
    pub const fn with_vref(mut self, vref: f32) -> Self {
        self.vref = vref;
        self
    }

    #[must_use]
    pub const fn with_calibration_settle_ms(mut self, ms: u32) -> Self {
        self.calibration_settle_ms = ms;
        self
    }

    #[must_use]
    pub const fn with_command_to_read_delay_ns(mut self, ns: u32) -> Self {
        self.command_to_read_delay_ns = ns;
        self
    }

    #[must_use]
    pub const fn with_ready_timeout_us(mut self, timeout_us: Option<u32>) -> Self {
        self.ready_timeout_us = timeout_us;
        self
    }

    #[must_use]
    pub const fn with_verify_policy(mut self, policy: VerifyPolicy) -> Self {
        self.verify_policy = policy;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
