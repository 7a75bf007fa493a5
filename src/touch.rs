//! XPT2046 resistive touch controller and the mapping from its raw
//! readings to display coordinates.

use embedded_graphics::prelude::Point;
use embedded_hal::spi::SpiDevice;
use log::debug;

use crate::hal::TouchInput;

/// Control bytes: start bit, channel select, 12-bit, differential mode.
const CMD_READ_X: u8 = 0xD0;
const CMD_READ_Y: u8 = 0x90;
const CMD_READ_Z1: u8 = 0xB0;
const CMD_READ_Z2: u8 = 0xC0;

/// Minimum pressure (z1 + 4095 - z2) for a reading to count as a touch.
pub const PRESSURE_THRESHOLD: i32 = 400;
const SAMPLES: u32 = 4;
const RAW_MAX: u16 = 4095;

/// Averaged 12-bit reading in the controller's native axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTouch {
    pub x: u16,
    pub y: u16,
    pub z: i32,
}

/// Raw ADC span of the panel and the native pixel size it maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub x_min: u16,
    pub x_max: u16,
    pub y_min: u16,
    pub y_max: u16,
    pub width: u16,
    pub height: u16,
}

impl Calibration {
    /// Typical CYD (ESP32-2432S028R) panel in its native portrait axes.
    pub const CYD: Calibration = Calibration {
        x_min: 200,
        x_max: 3700,
        y_min: 240,
        y_max: 3800,
        width: 240,
        height: 320,
    };

    pub fn to_native(&self, raw: RawTouch) -> Point {
        Point::new(
            scale_axis(raw.x, self.x_min, self.x_max, self.width),
            scale_axis(raw.y, self.y_min, self.y_max, self.height),
        )
    }
}

fn scale_axis(v: u16, lo: u16, hi: u16, span: u16) -> i32 {
    let range = hi.saturating_sub(lo).max(1) as i32;
    let v = v.clamp(lo, hi) as i32 - lo as i32;
    (v * span as i32 / range).min(span as i32 - 1).max(0)
}

/// Maps native touch points into display coordinates: optional axis swap,
/// then optional reflection of each axis against the display size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchTransform {
    pub swap_xy: bool,
    pub reflect_x: bool,
    pub reflect_y: bool,
    pub width: i32,
    pub height: i32,
}

impl TouchTransform {
    /// `x' = raw_y; y' = height - raw_x`, used with the panel in landscape.
    /// [`apply`](Self::apply) clamps into the screen, so native `x = 0`
    /// lands on `y' = height - 1` rather than `height`.
    pub const fn landscape(width: i32, height: i32) -> Self {
        Self { swap_xy: true, reflect_x: false, reflect_y: true, width, height }
    }

    pub fn apply(&self, p: Point) -> Point {
        let (mut x, mut y) = if self.swap_xy { (p.y, p.x) } else { (p.x, p.y) };
        if self.reflect_x {
            x = self.width - x;
        }
        if self.reflect_y {
            y = self.height - y;
        }
        Point::new(x.clamp(0, self.width - 1), y.clamp(0, self.height - 1))
    }
}

pub struct Xpt2046<SPI> {
    spi: SPI,
    calibration: Calibration,
    transform: TouchTransform,
    err_count: u32,
}

impl<SPI: SpiDevice> Xpt2046<SPI> {
    pub fn new(spi: SPI, calibration: Calibration, transform: TouchTransform) -> Self {
        Self { spi, calibration, transform, err_count: 0 }
    }

    fn read_channel(&mut self, cmd: u8) -> Result<u16, SPI::Error> {
        let mut buf = [cmd, 0, 0];
        self.spi.transfer_in_place(&mut buf)?;
        Ok((((buf[1] as u16) << 8) | buf[2] as u16) >> 3 & RAW_MAX)
    }

    fn pressure(&mut self) -> Result<i32, SPI::Error> {
        let z1 = self.read_channel(CMD_READ_Z1)? as i32;
        let z2 = self.read_channel(CMD_READ_Z2)? as i32;
        Ok(z1 + RAW_MAX as i32 - z2)
    }

    /// Averaged raw reading, or `None` while the panel is not pressed.
    pub fn read_raw(&mut self) -> Result<Option<RawTouch>, SPI::Error> {
        let z = self.pressure()?;
        if z < PRESSURE_THRESHOLD {
            return Ok(None);
        }
        let (mut sx, mut sy) = (0u32, 0u32);
        for _ in 0..SAMPLES {
            sx += self.read_channel(CMD_READ_X)? as u32;
            sy += self.read_channel(CMD_READ_Y)? as u32;
        }
        Ok(Some(RawTouch {
            x: (sx / SAMPLES) as u16,
            y: (sy / SAMPLES) as u16,
            z,
        }))
    }
}

impl<SPI: SpiDevice> TouchInput for Xpt2046<SPI> {
    fn poll_point(&mut self) -> Option<Point> {
        match self.read_raw() {
            Ok(Some(raw)) => {
                let native = self.calibration.to_native(raw);
                Some(self.transform.apply(native))
            }
            Ok(None) => None,
            Err(_) => {
                self.err_count += 1;
                if self.err_count % 50 == 1 {
                    debug!("TOUCH spi errors: {}", self.err_count);
                }
                None
            }
        }
    }
}

/// Turns a stream of press samples into taps reported on release.
#[derive(Debug, Default)]
pub struct TapTracker {
    pressed: bool,
    last: Point,
}

impl TapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, sample: Option<Point>) -> Option<Point> {
        match sample {
            Some(p) => {
                if !self.pressed {
                    debug!("TOUCH down at ({}, {})", p.x, p.y);
                }
                self.pressed = true;
                self.last = p;
                None
            }
            None if self.pressed => {
                self.pressed = false;
                debug!("TOUCH -> Tap at ({}, {})", self.last.x, self.last.y);
                Some(self.last)
            }
            None => None,
        }
    }
}
