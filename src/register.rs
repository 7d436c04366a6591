//! Command opcodes, register addresses and bit-field encodings for the ADS1256.

use embedded_hal::spi::{MODE_1, Mode};

/// SPI mode required by the ADS1256 (CPOL = 0, CPHA = 1)
pub const MODE: Mode = MODE_1;

/// Factory-programmed identification nibble found in `STATUS[7:4]`
pub const CHIP_ID: u8 = 3;

/// Second byte of every RREG/WREG command: number of registers minus one
pub(crate) const SINGLE_REGISTER: u8 = 0x00;

/// SPI commands (datasheet table 24)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Complete SYNC and exit standby mode
    Wakeup = 0x00,
    /// Read data
    ReadData = 0x01,
    /// Read data continuously
    ReadDataContinuous = 0x03,
    /// Stop read data continuously
    StopReadDataContinuous = 0x0F,
    /// Read from register; OR with the register address
    ReadRegister = 0x10,
    /// Write to register; OR with the register address
    WriteRegister = 0x50,
    /// Offset and gain self-calibration
    SelfCalibrate = 0xF0,
    /// Offset self-calibration
    SelfOffsetCalibrate = 0xF1,
    /// Gain self-calibration
    SelfGainCalibrate = 0xF2,
    /// System offset calibration
    SystemOffsetCalibrate = 0xF3,
    /// System gain calibration
    SystemGainCalibrate = 0xF4,
    /// Synchronize the A/D conversion
    Sync = 0xFC,
    /// Begin standby mode
    Standby = 0xFD,
    /// Reset to power-up values
    Reset = 0xFE,
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

/// Register addresses (datasheet table 23)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Status control
    Status = 0x00,
    /// Input multiplexer control
    Mux = 0x01,
    /// A/D control: clock out, sensor detect, PGA
    Adcon = 0x02,
    /// A/D data rate
    Drate = 0x03,
    /// GPIO control
    Io = 0x04,
    /// Offset calibration byte 0 (least significant)
    Ofc0 = 0x05,
    /// Offset calibration byte 1
    Ofc1 = 0x06,
    /// Offset calibration byte 2 (most significant)
    Ofc2 = 0x07,
    /// Full-scale calibration byte 0 (least significant)
    Fsc0 = 0x08,
    /// Full-scale calibration byte 1
    Fsc1 = 0x09,
    /// Full-scale calibration byte 2 (most significant)
    Fsc2 = 0x0A,
}

impl From<Register> for u8 {
    fn from(reg: Register) -> u8 {
        reg as u8
    }
}

impl Register {
    /// First byte of an RREG command addressing this register
    #[must_use]
    pub const fn read_opcode(self) -> u8 {
        Command::ReadRegister as u8 | self as u8
    }

    /// First byte of a WREG command addressing this register
    #[must_use]
    pub const fn write_opcode(self) -> u8 {
        Command::WriteRegister as u8 | self as u8
    }

    /// RREG frame reading this register alone
    pub(crate) const fn read_frame(self) -> [u8; 2] {
        [self.read_opcode(), SINGLE_REGISTER]
    }

    /// WREG frame writing `value` to this register alone
    pub(crate) const fn write_frame(self, value: u8) -> [u8; 3] {
        [self.write_opcode(), SINGLE_REGISTER, value]
    }

    /// Power-up value, if it is fixed by the datasheet
    ///
    /// STATUS carries the factory ID nibble and the calibration registers
    /// depend on the part, so those return `None`.
    #[must_use]
    pub const fn reset_value(self) -> Option<u8> {
        match self {
            Self::Mux => Some(0x01),
            Self::Adcon => Some(0x20),
            Self::Drate => Some(0xF0),
            Self::Io => Some(0xE0),
            _ => None,
        }
    }

    /// Bits that hold what was last written
    ///
    /// The ID nibble and the DRDY bit of STATUS are read-only and must not
    /// take part in write comparisons.
    #[must_use]
    pub const fn writable_mask(self) -> u8 {
        match self {
            Self::Status => 0b0000_1110,
            _ => 0xFF,
        }
    }
}

/// Analog input selector for one half of the multiplexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Input {
    Ain0 = 0,
    Ain1 = 1,
    Ain2 = 2,
    Ain3 = 3,
    Ain4 = 4,
    Ain5 = 5,
    Ain6 = 6,
    Ain7 = 7,
    /// AINCOM; the lower three selector bits are "don't care"
    Common = 8,
}

impl Input {
    /// The eight physical inputs in ascending order
    pub const PHYSICAL: [Input; 8] = [
        Self::Ain0,
        Self::Ain1,
        Self::Ain2,
        Self::Ain3,
        Self::Ain4,
        Self::Ain5,
        Self::Ain6,
        Self::Ain7,
    ];

    const fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0 => Self::Ain0,
            1 => Self::Ain1,
            2 => Self::Ain2,
            3 => Self::Ain3,
            4 => Self::Ain4,
            5 => Self::Ain5,
            6 => Self::Ain6,
            7 => Self::Ain7,
            _ => Self::Common,
        }
    }
}

/// Content of the MUX register: positive input in bits 7..4, negative in 3..0
///
/// Nothing stops both halves from naming the same input; such a reading is
/// simply meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mux {
    positive: Input,
    negative: Input,
}

impl Mux {
    /// Power-up selection: AIN0 against AIN1
    pub const RESET: Mux = Mux::new(Input::Ain0, Input::Ain1);

    /// Adjacent input pairs AIN0-AIN1, AIN2-AIN3, AIN4-AIN5, AIN6-AIN7
    pub const DIFFERENTIAL_PAIRS: [Mux; 4] = [
        Mux::differential(Input::Ain0, Input::Ain1),
        Mux::differential(Input::Ain2, Input::Ain3),
        Mux::differential(Input::Ain4, Input::Ain5),
        Mux::differential(Input::Ain6, Input::Ain7),
    ];

    /// Select an arbitrary positive/negative pair
    #[must_use]
    pub const fn new(positive: Input, negative: Input) -> Self {
        Self { positive, negative }
    }

    /// Measure `input` against AINCOM
    #[must_use]
    pub const fn single_ended(input: Input) -> Self {
        Self::new(input, Input::Common)
    }

    /// Measure `positive` against `negative`
    #[must_use]
    pub const fn differential(positive: Input, negative: Input) -> Self {
        Self::new(positive, negative)
    }

    /// Decode a register byte; selector values 9..15 collapse to [`Input::Common`]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self::new(Input::from_nibble(bits >> 4), Input::from_nibble(bits))
    }

    #[must_use]
    pub const fn positive(&self) -> Input {
        self.positive
    }

    #[must_use]
    pub const fn negative(&self) -> Input {
        self.negative
    }

    /// Register byte: `(positive << 4) | negative`
    #[must_use]
    pub const fn bits(&self) -> u8 {
        ((self.positive as u8) << 4) | self.negative as u8
    }
}

impl From<Mux> for u8 {
    fn from(mux: Mux) -> u8 {
        mux.bits()
    }
}

/// Programmable gain amplifier setting (`ADCON[2:0]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
}

impl Gain {
    /// All gain settings, lowest first
    pub const ALL: [Gain; 7] = [
        Self::X1,
        Self::X2,
        Self::X4,
        Self::X8,
        Self::X16,
        Self::X32,
        Self::X64,
    ];

    /// PGA field encoding; the gain is `2^code`
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Amplification factor
    #[must_use]
    pub const fn multiplier(self) -> u8 {
        1 << self as u8
    }

    /// Decode a PGA field; codes 6 and 7 both select 64x
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code & 0b111 {
            0 => Self::X1,
            1 => Self::X2,
            2 => Self::X4,
            3 => Self::X8,
            4 => Self::X16,
            5 => Self::X32,
            _ => Self::X64,
        }
    }
}

/// A/D data rate (DRATE register, datasheet table 25)
///
/// The encodings are fixed by the device and not derivable from the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataRate {
    Sps30000 = 0xF0,
    Sps15000 = 0xE0,
    Sps7500 = 0xD0,
    Sps3750 = 0xC0,
    Sps2000 = 0xB0,
    Sps1000 = 0xA1,
    Sps500 = 0x92,
    Sps100 = 0x82,
    Sps60 = 0x72,
    Sps50 = 0x63,
    Sps30 = 0x53,
    Sps25 = 0x43,
    Sps15 = 0x33,
    Sps10 = 0x23,
    Sps5 = 0x13,
    Sps2_5 = 0x03,
}

impl DataRate {
    /// All supported rates, fastest first
    pub const ALL: [DataRate; 16] = [
        Self::Sps30000,
        Self::Sps15000,
        Self::Sps7500,
        Self::Sps3750,
        Self::Sps2000,
        Self::Sps1000,
        Self::Sps500,
        Self::Sps100,
        Self::Sps60,
        Self::Sps50,
        Self::Sps30,
        Self::Sps25,
        Self::Sps15,
        Self::Sps10,
        Self::Sps5,
        Self::Sps2_5,
    ];

    /// DRATE register byte
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Samples per second at a 7.68 MHz master clock
    #[must_use]
    pub const fn sps(self) -> f32 {
        match self {
            Self::Sps30000 => 30_000.0,
            Self::Sps15000 => 15_000.0,
            Self::Sps7500 => 7_500.0,
            Self::Sps3750 => 3_750.0,
            Self::Sps2000 => 2_000.0,
            Self::Sps1000 => 1_000.0,
            Self::Sps500 => 500.0,
            Self::Sps100 => 100.0,
            Self::Sps60 => 60.0,
            Self::Sps50 => 50.0,
            Self::Sps30 => 30.0,
            Self::Sps25 => 25.0,
            Self::Sps15 => 15.0,
            Self::Sps10 => 10.0,
            Self::Sps5 => 5.0,
            Self::Sps2_5 => 2.5,
        }
    }

    /// Look up the rate for a DRATE byte; bytes outside the table yield `None`
    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.bits() == bits)
    }
}

/// D0/CLKOUT output rate (`ADCON[6:5]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ClockOut {
    Off = 0b00,
    /// f<sub>CLKIN</sub>
    Full = 0b01,
    /// f<sub>CLKIN</sub> / 2
    Half = 0b10,
    /// f<sub>CLKIN</sub> / 4
    Quarter = 0b11,
}

/// Sensor detect current sources (`ADCON[4:3]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SensorDetect {
    Off = 0b00,
    /// 0.5 µA
    Micro0_5 = 0b01,
    /// 2 µA
    Micro2 = 0b10,
    /// 10 µA
    Micro10 = 0b11,
}

bitfield::bitfield! {
    /// STATUS
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct StatusRegister(u8);
    impl Debug;
    u8;
    /// Factory programmed identification bits (read only)
    pub id, _: 7, 4;
    /// Output bit order
    ///
    /// - `0` = most significant bit first
    /// - `1` = least significant bit first
    pub order, set_order: 3;
    /// Self-calibrate after every WREG that changes PGA, DRATE or BUFEN
    pub acal, set_acal: 2;
    /// Analog input buffer enable
    pub bufen, set_bufen: 1;
    /// Duplicates the DRDY pin (read only)
    pub drdy, _: 0;
}

impl StatusRegister {
    /// Identity bits plus the given configuration bits, as programmed by `init`
    #[must_use]
    pub fn configured(input_buffer: bool, auto_calibration: bool, lsb_first: bool) -> Self {
        let mut status = StatusRegister(CHIP_ID << 4);
        status.set_bufen(input_buffer);
        status.set_acal(auto_calibration);
        status.set_order(lsb_first);
        status
    }

    /// Check the identification nibble against [`CHIP_ID`]
    #[must_use]
    pub fn is_expected_chip(&self) -> bool {
        self.id() == CHIP_ID
    }

    /// A conversion result is waiting (DRDY is active low)
    #[must_use]
    pub fn data_ready(&self) -> bool {
        !self.drdy()
    }
}

bitfield::bitfield! {
    /// ADCON
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct AdconRegister(u8);
    impl Debug;
    u8;
    /// D0/CLKOUT rate, see [`ClockOut`]; only a hardware reset restores it
    pub clk, set_clk: 6, 5;
    /// Sensor detect current, see [`SensorDetect`]
    pub sdcs, set_sdcs: 4, 3;
    /// Programmable gain, see [`Gain`]
    pub pga, set_pga: 2, 0;
}

impl AdconRegister {
    /// Build the register from its three fields
    #[must_use]
    pub fn new(clock_out: ClockOut, sensor_detect: SensorDetect, gain: Gain) -> Self {
        let mut adcon = AdconRegister(0);
        adcon.set_clk(clock_out as u8);
        adcon.set_sdcs(sensor_detect as u8);
        adcon.set_pga(gain.code());
        adcon
    }

    /// Decoded PGA setting
    #[must_use]
    pub fn gain(&self) -> Gain {
        Gain::from_code(self.pga())
    }
}

bitfield::bitfield! {
    /// IO: direction and level of the four digital pins D0..D3
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct IoRegister(u8);
    impl Debug;
    u8;
    /// Pin directions, one bit per pin; `1` = input
    pub dir, set_dir: 7, 4;
    /// Pin levels: read for inputs, driven for outputs
    pub dio, set_dio: 3, 0;
}

impl IoRegister {
    /// Whether digital pin `pin` (0..=3) is configured as an input
    #[must_use]
    pub fn is_input(&self, pin: u8) -> bool {
        self.dir() & (1 << (pin & 0b11)) != 0
    }

    /// Level of digital pin `pin` (0..=3)
    #[must_use]
    pub fn level(&self, pin: u8) -> bool {
        self.dio() & (1 << (pin & 0b11)) != 0
    }
}
