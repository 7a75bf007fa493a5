//! ESP-IDF implementations of the hardware seams.

pub mod display;
pub mod http_client;
pub mod light;
pub mod nvs;
pub mod touch;
pub mod wifi;

use anyhow::Result;

use crate::hal::Clock;

pub fn esp_check(res: esp_idf_sys::esp_err_t, msg: &str) -> Result<()> {
    if res != esp_idf_sys::ESP_OK {
        Err(anyhow::anyhow!("{} (err {})", msg, res))
    } else {
        Ok(())
    }
}

pub fn now_ms() -> u32 {
    unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
}

/// Millisecond clock on `esp_timer`; sleeping yields to FreeRTOS.
#[derive(Debug, Default, Clone, Copy)]
pub struct EspClock;

impl Clock for EspClock {
    fn now_ms(&self) -> u32 {
        now_ms()
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}
