//! Basic example for STM32 with Embassy
//!
//! Reads the single-ended inputs of an ADS1256 board (e.g. the Waveshare
//! High-Precision AD/DA) and prints the voltage on AIN0.
//!
//! Hardware setup:
//! - ADS1256 connected via SPI1
//! - SPI pins: SCK=PA5, MOSI=PA7, MISO=PA6, CS=PA4
//! - DRDY on PA3 (EXTI3)
//! - SPI Mode 1 (CPOL=0, CPHA=1)
//! - 1 MHz clock frequency (at most fCLKIN / 4)

#![no_std]
#![no_main]

use ads1256::{Ads1256Async, Config, DataRate, Gain, MODE, PinReady};
use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::{
    exti::ExtiInput,
    gpio::{Level, Output, Pull, Speed},
    spi,
    time::Hertz,
};
use embassy_time::{Delay, Timer};
use {defmt_rtt as _, panic_probe as _};

// Embassy shared bus support
use embassy_embedded_hal::shared_bus::spi::SpiDevice;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;

// Static storage for shared SPI bus
static SPI_BUS: StaticCell<Mutex<NoopRawMutex, spi::Spi<'static, spi::SPI1>>> = StaticCell::new();

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());

    let mut spi_config = spi::Config::default();
    spi_config.mode = MODE;
    spi_config.frequency = Hertz(1_000_000);

    let spi = spi::Spi::new(
        p.SPI1,
        p.PA5,
        p.PA7,
        p.PA6,
        p.DMA1_CH1,
        p.DMA1_CH2,
        spi_config,
    );

    let spi_bus = Mutex::new(spi);
    let spi_bus = SPI_BUS.init(spi_bus);

    let cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
    let spi_device = SpiDevice::new(spi_bus, cs);
    let drdy = PinReady::new(ExtiInput::new(p.PA3, p.EXTI3, Pull::Up));

    let config = Config::default()
        .with_gain(Gain::X1)
        .with_data_rate(DataRate::Sps1000)
        .with_vref(2.5);
    let mut adc = Ads1256Async::new(spi_device, drdy, Delay, config);

    if let Err(e) = adc.init().await {
        error!("ADS1256 init failed: {:?}", e);
        return;
    }

    info!("ADS1256 driver initialized");

    loop {
        match adc.read_all_channels().await {
            Ok(samples) => {
                let volts = ads1256::to_voltage(samples[0], config.vref, config.gain);
                info!("AIN0: {} V (0x{:06X})", volts, samples[0]);
            }
            Err(e) => {
                error!("Conversion error: {:?}", e);
            }
        }

        Timer::after_millis(100).await;
    }
}
