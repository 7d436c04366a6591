//! Driver behaviour against a register-level model of the ADS1256.
//!
//! The mock SPI tests pin down exact bytes; these check that the driver keeps
//! a consistent device state over longer sequences.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use ads1256::{
    Ads1256, Config, DataReady, Error, Gain, Input, Mux, Register, SessionState, VerifyPolicy,
    WriteOutcome, sign_extend,
};
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};
use embedded_hal_mock::eh1::delay::NoopDelay;
use proptest::prelude::*;

const REGISTER_COUNT: usize = 11;
const POWER_UP: [u8; REGISTER_COUNT] = [0x30, 0x01, 0x20, 0xF0, 0xE0, 0, 0, 0, 0, 0, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    /// The driver consumed a DRDY notification
    Ready,
    /// First byte of a command frame
    Command(u8),
}

type Log = Rc<RefCell<Vec<Event>>>;

/// SPI side of the model: registers, command decoding and conversions
struct SimulatedAds1256 {
    registers: [u8; REGISTER_COUNT],
    /// Code presented on each input, AINCOM last
    inputs: [u32; 9],
    /// Register that ignores writes
    stuck: Option<u8>,
    output: VecDeque<u8>,
    log: Log,
}

impl SimulatedAds1256 {
    fn new(log: Log) -> Self {
        Self {
            registers: POWER_UP,
            inputs: [0; 9],
            stuck: None,
            output: VecDeque::new(),
            log,
        }
    }

    fn with_inputs(mut self, inputs: [u32; 8]) -> Self {
        self.inputs[..8].copy_from_slice(&inputs);
        self
    }

    fn with_stuck_register(mut self, register: Register) -> Self {
        self.stuck = Some(register as u8);
        self
    }

    fn command(&mut self, frame: &[u8]) {
        let opcode = frame[0];
        self.log.borrow_mut().push(Event::Command(opcode));

        match opcode {
            0x10..=0x1A => {
                assert_eq!(frame, [opcode, 0x00], "RREG of a single register");
                let value = self.registers[usize::from(opcode & 0x0F)];
                self.output.push_back(value);
            }
            0x50..=0x5A => {
                assert_eq!(frame.len(), 3, "WREG of a single register");
                assert_eq!(frame[1], 0x00);
                let address = opcode & 0x0F;
                if self.stuck != Some(address) {
                    self.registers[usize::from(address)] = if address == 0 {
                        (self.registers[0] & 0xF1) | (frame[2] & 0x0E)
                    } else {
                        frame[2]
                    };
                }
            }
            0x01 => {
                let mux = Mux::from_bits(self.registers[1]);
                let code = self.inputs[mux.positive() as usize]
                    .wrapping_sub(self.inputs[mux.negative() as usize])
                    & 0xFF_FFFF;
                self.output.extend(&code.to_be_bytes()[1..]);
            }
            0xFE => {
                self.registers = POWER_UP;
                self.output.clear();
            }
            0x00 | 0x0F | 0xF0..=0xF4 | 0xFC | 0xFD => {}
            other => panic!("unexpected command 0x{other:02X}"),
        }
    }
}

impl ErrorType for SimulatedAds1256 {
    type Error = Infallible;
}

impl SpiDevice for SimulatedAds1256 {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        for operation in operations {
            match operation {
                Operation::Write(frame) => self.command(frame),
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = self.output.pop_front().expect("read without pending data");
                    }
                }
                Operation::DelayNs(ns) => {
                    assert!(*ns >= Config::DEFAULT_COMMAND_TO_READ_DELAY_NS);
                }
                Operation::Transfer(..) | Operation::TransferInPlace(..) => {
                    panic!("the driver never transfers full duplex")
                }
            }
        }
        Ok(())
    }
}

/// DRDY side of the model: always ready, recorded in the shared log
struct SimulatedReady {
    log: Log,
}

impl DataReady for SimulatedReady {
    type Error = Infallible;

    fn take_ready(&mut self) -> Result<bool, Infallible> {
        self.log.borrow_mut().push(Event::Ready);
        Ok(true)
    }
}

type Driver = Ads1256<SimulatedAds1256, SimulatedReady, NoopDelay>;

fn driver(device: impl FnOnce(Log) -> SimulatedAds1256, config: Config) -> (Driver, Log) {
    let log = Log::default();
    let spi = device(Rc::clone(&log));
    let ready = SimulatedReady {
        log: Rc::clone(&log),
    };
    (Ads1256::new(spi, ready, NoopDelay, config), log)
}

fn initialized(inputs: [u32; 8]) -> (Driver, Log) {
    let (mut adc, log) = driver(
        |log| SimulatedAds1256::new(log).with_inputs(inputs),
        Config::default(),
    );
    adc.init().unwrap();
    log.borrow_mut().clear();
    (adc, log)
}

#[test]
fn init_leaves_configured_registers() {
    let (mut adc, _) = initialized([0; 8]);

    assert_eq!(adc.state(), SessionState::Ready);
    assert_eq!(adc.read_register(Register::Status).unwrap(), 0x32);
    assert_eq!(adc.read_register(Register::Mux).unwrap(), 0x01);
    assert_eq!(adc.read_register(Register::Adcon).unwrap(), 0x06);
    assert_eq!(adc.read_register(Register::Drate).unwrap(), 0xA1);

    let status = adc.read_status().unwrap();
    assert!(status.bufen());
    assert!(status.data_ready());
}

#[test]
fn init_is_repeatable() {
    let (mut adc, log) = initialized([0; 8]);

    adc.init().unwrap();

    // Second run only rewrites what RESET restored
    let writes = log
        .borrow()
        .iter()
        .filter(|event| matches!(event, Event::Command(0x50..=0x5A)))
        .count();
    assert_eq!(writes, 3);
}

#[test]
fn waits_precede_every_conversion() {
    let (mut adc, log) = initialized([0; 8]);

    adc.read_all_channels().unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 8 * 5);
    for (chunk, input) in log.chunks(5).zip(Input::PHYSICAL) {
        assert_eq!(
            chunk,
            [
                Event::Ready,
                Event::Command(0x51),
                Event::Command(0xFC),
                Event::Command(0x00),
                Event::Command(0x01),
            ],
            "conversion of {input:?}"
        );
    }
}

#[test]
fn conversions_follow_the_multiplexer() {
    let inputs = [100, 200, 300, 400, 0x7F_FFFF, 0, 5, 7];
    let (mut adc, _) = initialized(inputs);

    assert_eq!(adc.read_all_channels().unwrap(), inputs);

    let pairs = adc.read_differential_pairs().unwrap();
    assert_eq!(sign_extend(pairs[0]), -100);
    assert_eq!(sign_extend(pairs[1]), -100);
    assert_eq!(sign_extend(pairs[2]), 0x7F_FFFF);
    assert_eq!(sign_extend(pairs[3]), -2);

    assert_eq!(adc.read_register(Register::Mux).unwrap(), 0x67);
}

#[test]
fn voltage_of_negative_input() {
    let mut inputs = [0; 8];
    inputs[2] = 0xC0_0000;
    let (mut adc, _) = initialized(inputs);

    let volts = adc.read_voltage(Mux::single_ended(Input::Ain2)).unwrap();
    assert!((volts + 2.5 / f32::from(Gain::X64.multiplier())).abs() < 1e-7);
}

#[test]
fn reset_restores_power_up_registers() {
    let (mut adc, _) = initialized([0; 8]);

    assert_eq!(
        adc.write_register(Register::Io, 0x0F).unwrap(),
        WriteOutcome::Verified
    );
    adc.reset().unwrap();
    assert_eq!(adc.state(), SessionState::Uninitialized);

    adc.init().unwrap();
    assert_eq!(adc.read_register(Register::Io).unwrap(), 0xE0);
}

#[test]
fn stuck_register_fails_strict_init() {
    let (mut adc, _) = driver(
        |log| SimulatedAds1256::new(log).with_stuck_register(Register::Drate),
        Config::default(),
    );

    assert_eq!(
        adc.init(),
        Err(Error::RegisterWriteVerificationFailed {
            register: Register::Drate,
            value: 0xA1,
            readback: 0xF0,
        })
    );
    assert_eq!(adc.state(), SessionState::Uninitialized);
}

#[test]
fn stuck_register_is_tolerated_when_lenient() {
    let (mut adc, _) = driver(
        |log| SimulatedAds1256::new(log).with_stuck_register(Register::Drate),
        Config::default().with_verify_policy(VerifyPolicy::Lenient),
    );

    adc.init().unwrap();
    assert_eq!(adc.read_register(Register::Drate).unwrap(), 0xF0);
    assert_eq!(
        adc.write_register(Register::Drate, 0x03).unwrap(),
        WriteOutcome::Unverified { readback: 0xF0 }
    );
}

#[test]
fn read_only_status_bits_are_preserved() {
    let (mut adc, _) = initialized([0; 8]);

    let outcome = adc.write_register(Register::Status, 0x04).unwrap();
    assert_eq!(outcome, WriteOutcome::Verified);

    let status = adc.read_status().unwrap();
    assert!(status.is_expected_chip());
    assert!(status.acal());
    assert!(!status.bufen());
}

fn writable_register() -> impl Strategy<Value = Register> {
    prop::sample::select(vec![
        Register::Mux,
        Register::Adcon,
        Register::Drate,
        Register::Io,
        Register::Ofc0,
        Register::Ofc1,
        Register::Ofc2,
        Register::Fsc0,
        Register::Fsc1,
        Register::Fsc2,
    ])
}

proptest! {
    #[test]
    fn written_value_reads_back(register in writable_register(), value in any::<u8>()) {
        let (mut adc, log) = initialized([0; 8]);
        let before = adc.read_register(register).unwrap();
        log.borrow_mut().clear();

        let outcome = adc.write_register(register, value).unwrap();

        prop_assert!(outcome.is_applied());
        prop_assert_eq!(adc.read_register(register).unwrap(), value);

        let frames = log.borrow().iter().filter(|e| matches!(e, Event::Command(0x50..=0x5A))).count();
        if before == value {
            prop_assert_eq!(outcome, WriteOutcome::Unchanged);
            prop_assert_eq!(frames, 0);
        } else {
            prop_assert_eq!(outcome, WriteOutcome::Verified);
            prop_assert_eq!(frames, 1);
        }
    }

    #[test]
    fn single_ended_returns_input_code(input in 0usize..8, code in 0u32..=0xFF_FFFF) {
        let mut inputs = [0; 8];
        inputs[input] = code;
        let (mut adc, _) = initialized(inputs);

        let raw = adc.read_single_ended(Mux::single_ended(Input::PHYSICAL[input])).unwrap();
        prop_assert_eq!(raw, code);
    }
}
