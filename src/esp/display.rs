use anyhow::{anyhow, Result};
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, Output, PinDriver};
use esp_idf_hal::ledc::config::TimerConfig as LedcTimerConfig;
use esp_idf_hal::ledc::{LedcChannel, LedcDriver, LedcTimer, LedcTimerDriver, Resolution};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;
use esp_idf_hal::spi::config::{Config as SpiDeviceConfig, DriverConfig as SpiDriverConfig};
use esp_idf_hal::spi::{SpiAnyPins, SpiDeviceDriver, SpiDriver};
use log::{info, warn};
use mipidsi::interface::SpiInterface;
use mipidsi::models::ILI9341Rgb565;
use mipidsi::options::{ColorOrder, Orientation, Rotation};
use mipidsi::Builder;

use crate::board::{DisplayPins, BACKLIGHT_PWM_HZ, DISPLAY_HEIGHT, DISPLAY_WIDTH, SPI_FREQ_HZ};
use crate::hal::PwmOutput;

/// Bytes batched per SPI write by the display interface.
const SPI_BUFFER_LEN: usize = 4096;

pub type Panel = mipidsi::Display<
    SpiInterface<
        'static,
        SpiDeviceDriver<'static, SpiDriver<'static>>,
        PinDriver<'static, AnyOutputPin, Output>,
    >,
    ILI9341Rgb565,
    PinDriver<'static, AnyOutputPin, Output>,
>;

/// ILI9341 over SPI, rotated to 320x240 landscape.
pub fn init_panel<SPI: SpiAnyPins>(spi: impl Peripheral<P = SPI> + 'static, pins: &DisplayPins) -> Result<Panel> {
    let driver = SpiDriver::new(
        spi,
        unsafe { AnyIOPin::new(pins.sclk) },
        unsafe { AnyIOPin::new(pins.mosi) },
        Some(unsafe { AnyInputPin::new(pins.miso) }),
        &SpiDriverConfig::new(),
    )?;
    let dev_cfg = SpiDeviceConfig::new().baudrate(Hertz(SPI_FREQ_HZ));
    let spi_dev = SpiDeviceDriver::new(driver, Some(unsafe { AnyIOPin::new(pins.cs) }), &dev_cfg)?;

    let dc = PinDriver::output(unsafe { AnyOutputPin::new(pins.dc) })?;
    let rst = PinDriver::output(unsafe { AnyOutputPin::new(pins.rst) })?;

    let buf: &'static mut [u8; SPI_BUFFER_LEN] = Box::leak(Box::new([0u8; SPI_BUFFER_LEN]));
    let di = SpiInterface::new(spi_dev, dc, buf);

    // native portrait 240x320
    let panel = Builder::new(ILI9341Rgb565, di)
        .display_size(DISPLAY_HEIGHT as u16, DISPLAY_WIDTH as u16)
        .orientation(Orientation::new().rotate(Rotation::Deg90).flip_horizontal())
        .color_order(ColorOrder::Bgr)
        .reset_pin(rst)
        .init(&mut Ets)
        .map_err(|e| anyhow!("Display init failed: {:?}", e))?;

    info!("Display initialized OK ({}x{})", DISPLAY_WIDTH, DISPLAY_HEIGHT);
    Ok(panel)
}

/// LEDC channel driving the backlight with an 8-bit duty.
pub struct BacklightPwm {
    driver: LedcDriver<'static>,
    max_duty: u32,
}

impl BacklightPwm {
    pub fn new<C, T>(
        channel: impl Peripheral<P = C> + 'static,
        timer: impl Peripheral<P = T> + 'static,
        pin: i32,
    ) -> Result<Self>
    where
        C: LedcChannel<SpeedMode = T::SpeedMode>,
        T: LedcTimer + 'static,
    {
        let timer = LedcTimerDriver::new(
            timer,
            &LedcTimerConfig::default()
                .frequency(Hertz(BACKLIGHT_PWM_HZ))
                .resolution(Resolution::Bits8),
        )?;
        let driver = LedcDriver::new(channel, timer, unsafe { AnyOutputPin::new(pin) })?;
        let max_duty = driver.get_max_duty();
        info!("Backlight PWM on GPIO{} ({} Hz, max duty {})", pin, BACKLIGHT_PWM_HZ, max_duty);
        Ok(Self { driver, max_duty })
    }
}

impl PwmOutput for BacklightPwm {
    fn set_duty(&mut self, duty: u8) {
        let scaled = duty as u32 * self.max_duty / u8::MAX as u32;
        if let Err(e) = self.driver.set_duty(scaled) {
            warn!("Backlight set_duty({}) failed: {}", duty, e);
        }
    }
}
