//! Hardware seams between the core logic and a concrete board.
//!
//! The ESP-IDF implementations live in `crate::esp`; unit tests use small
//! in-memory fakes.

use anyhow::Result;
use embedded_graphics::prelude::*;

use crate::prefs::UiPreferences;

/// Single-channel ambient-light sensor (LDR behind an ADC).
pub trait LightSensor {
    /// Raw reading in `0..=sensor_max`.
    fn read_raw(&mut self) -> u16;
}

/// Backlight PWM output with an 8-bit duty cycle.
pub trait PwmOutput {
    fn set_duty(&mut self, duty: u8);
}

/// Touch panel already remapped into display coordinates.
pub trait TouchInput {
    fn poll_point(&mut self) -> Option<Point>;
}

/// Monotonic millisecond clock plus a blocking sleep.
pub trait Clock {
    fn now_ms(&self) -> u32;
    fn sleep_ms(&mut self, ms: u32);
}

/// Raw HTTP response: status code plus the body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Outbound network path used by the quote pipeline.
pub trait QuoteTransport {
    /// True when the station interface has an IP and can reach the API.
    fn link_up(&self) -> bool;

    /// Try to bring a dropped link back; true once it is up again.
    fn reconnect(&mut self) -> bool {
        false
    }

    fn get(&mut self, url: &str) -> Result<HttpResponse>;
}

/// Persistent storage for the settings screen.
pub trait PrefsStore {
    /// Stored preferences, or `None` when nothing was saved yet.
    fn load(&mut self) -> Option<UiPreferences>;
    fn save(&mut self, prefs: &UiPreferences) -> Result<()>;
}

/// Store for boards without persistence; keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrefsStore;

impl PrefsStore for NoPrefsStore {
    fn load(&mut self) -> Option<UiPreferences> {
        None
    }

    fn save(&mut self, _prefs: &UiPreferences) -> Result<()> {
        Ok(())
    }
}
