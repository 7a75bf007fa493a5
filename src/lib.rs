//! Quote display firmware for the ESP32-2432S028 "Cheap Yellow Display".
//!
//! Everything above the hardware seams in [`hal`] builds and tests on the
//! host; the ESP-IDF glue in `esp` is only compiled for the device.

pub mod app;
pub mod backlight;
pub mod board;
pub mod hal;
pub mod palette;
pub mod prefs;
pub mod quote;
pub mod render;
pub mod schedule;
pub mod settings;
pub mod touch;
pub mod typeface;
pub mod wrap;

#[cfg(target_os = "espidf")]
pub mod esp;
