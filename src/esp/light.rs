use anyhow::Result;
use log::{debug, info};

use super::esp_check;
use crate::board::LightSensorPin;
use crate::hal::LightSensor;

/// LDR on an ADC1 channel, 12-bit oneshot reads at 12 dB attenuation.
pub struct LdrAdc {
    unit: esp_idf_sys::adc_oneshot_unit_handle_t,
    channel: esp_idf_sys::adc_channel_t,
    err_count: u32,
}

impl LdrAdc {
    pub fn new(pin: &LightSensorPin) -> Result<Self> {
        let mut unit: esp_idf_sys::adc_oneshot_unit_handle_t = std::ptr::null_mut();
        let unit_cfg = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
            unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
            ulp_mode: esp_idf_sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        esp_check(
            unsafe { esp_idf_sys::adc_oneshot_new_unit(&unit_cfg, &mut unit) },
            "adc_oneshot_new_unit",
        )?;

        let channel = pin.adc1_channel as esp_idf_sys::adc_channel_t;
        let chan_cfg = esp_idf_sys::adc_oneshot_chan_cfg_t {
            atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        esp_check(
            unsafe { esp_idf_sys::adc_oneshot_config_channel(unit, channel, &chan_cfg) },
            "adc_oneshot_config_channel",
        )?;

        info!("LDR on GPIO{} (ADC1 ch{})", pin.gpio, pin.adc1_channel);
        Ok(Self { unit, channel, err_count: 0 })
    }
}

impl LightSensor for LdrAdc {
    fn read_raw(&mut self) -> u16 {
        let mut raw: i32 = 0;
        let rc = unsafe { esp_idf_sys::adc_oneshot_read(self.unit, self.channel, &mut raw) };
        if rc != esp_idf_sys::ESP_OK {
            // reads as a rail so a dead ADC trips the fault latch
            self.err_count += 1;
            if self.err_count % 50 == 1 {
                debug!("LDR read failed (err {}, {} total)", rc, self.err_count);
            }
            return 0;
        }
        raw.clamp(0, 4095) as u16
    }
}

impl Drop for LdrAdc {
    fn drop(&mut self) {
        unsafe {
            esp_idf_sys::adc_oneshot_del_unit(self.unit);
        }
    }
}
