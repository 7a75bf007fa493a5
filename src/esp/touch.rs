use anyhow::Result;
use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;
use esp_idf_hal::spi::config::{Config as SpiDeviceConfig, DriverConfig as SpiDriverConfig};
use esp_idf_hal::spi::{SpiAnyPins, SpiDeviceDriver, SpiDriver};
use log::info;

use crate::board::{BoardConfig, TouchPins, TOUCH_SPI_FREQ_HZ};
use crate::touch::Xpt2046;

pub type TouchPanel = Xpt2046<SpiDeviceDriver<'static, SpiDriver<'static>>>;

/// XPT2046 on its own SPI host (the CYD wires touch apart from the LCD bus).
pub fn init_touch<SPI: SpiAnyPins>(
    spi: impl Peripheral<P = SPI> + 'static,
    pins: &TouchPins,
    board: &BoardConfig,
) -> Result<TouchPanel> {
    let driver = SpiDriver::new(
        spi,
        unsafe { AnyIOPin::new(pins.sclk) },
        unsafe { AnyIOPin::new(pins.mosi) },
        Some(unsafe { AnyInputPin::new(pins.miso) }),
        &SpiDriverConfig::new(),
    )?;
    let dev_cfg = SpiDeviceConfig::new().baudrate(Hertz(TOUCH_SPI_FREQ_HZ));
    let dev = SpiDeviceDriver::new(driver, Some(unsafe { AnyIOPin::new(pins.cs) }), &dev_cfg)?;

    info!(
        "Touch XPT2046: SCLK={} MOSI={} MISO={} CS={}",
        pins.sclk, pins.mosi, pins.miso, pins.cs
    );
    Ok(Xpt2046::new(dev, board.touch_calibration, board.touch_transform))
}
