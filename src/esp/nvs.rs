use anyhow::Result;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use log::{info, warn};

use crate::hal::PrefsStore;
use crate::prefs::{self, UiPreferences};
use crate::quote::DEFAULT_QUOTE_URL;

pub const NS: &str = "app_cfg";

const KEY_WIFI_SSID: &str = "wifi_ssid";
const KEY_WIFI_PASS: &str = "wifi_pass";
const KEY_QUOTE_URL: &str = "quote_url";

/// Placeholder SSID; Wi-Fi is skipped while it is configured.
pub const PLACEHOLDER_SSID: &str = "YOUR_SSID";

const DEFAULT_WIFI_SSID: &str = match option_env!("LOCAL_WIFI_SSID") {
    Some(v) => v,
    None => PLACEHOLDER_SSID,
};
const DEFAULT_WIFI_PASS: &str = match option_env!("LOCAL_WIFI_PASS") {
    Some(v) => v,
    None => "YOUR_PASSWORD",
};
const DEFAULT_QUOTE_URL_OVERRIDE: Option<&str> = option_env!("LOCAL_QUOTE_URL");

pub struct Config {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub quote_url: String,
}

/// Read a string from NVS, returning None if the key is absent or on error.
fn nvs_get_str(nvs: &EspNvs<NvsDefault>, key: &str) -> Option<String> {
    let len = match nvs.str_len(key) {
        Ok(Some(len)) => len,
        _ => return None,
    };

    let mut buf = vec![0u8; len];
    match nvs.get_str(key, &mut buf) {
        Ok(Some(val)) => {
            let s = val.trim_end_matches('\0').to_string();
            if s.is_empty() { None } else { Some(s) }
        }
        _ => None,
    }
}

impl Config {
    /// Load configuration from NVS, falling back to build-time defaults for
    /// any missing keys.
    pub fn load(nvs: &EspNvs<NvsDefault>) -> Config {
        let wifi_ssid = nvs_get_str(nvs, KEY_WIFI_SSID)
            .unwrap_or_else(|| DEFAULT_WIFI_SSID.to_string());
        info!("NVS wifi_ssid = {:?}", wifi_ssid);

        let wifi_pass = nvs_get_str(nvs, KEY_WIFI_PASS)
            .unwrap_or_else(|| DEFAULT_WIFI_PASS.to_string());
        info!("NVS wifi_pass = <{} chars>", wifi_pass.len());

        let quote_url = nvs_get_str(nvs, KEY_QUOTE_URL)
            .or_else(|| DEFAULT_QUOTE_URL_OVERRIDE.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_QUOTE_URL.to_string());
        info!("NVS quote_url = {:?}", quote_url);

        Config { wifi_ssid, wifi_pass, quote_url }
    }

    pub fn wifi_configured(&self) -> bool {
        !self.wifi_ssid.is_empty() && self.wifi_ssid != PLACEHOLDER_SSID
    }
}

/// Display preferences in their own namespace, opened per operation.
pub struct NvsPrefsStore {
    partition: EspDefaultNvsPartition,
}

impl NvsPrefsStore {
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        Self { partition }
    }

    fn open(&self) -> Result<EspNvs<NvsDefault>> {
        Ok(EspNvs::new(self.partition.clone(), prefs::NAMESPACE, true)?)
    }
}

impl PrefsStore for NvsPrefsStore {
    fn load(&mut self) -> Option<UiPreferences> {
        let nvs = match self.open() {
            Ok(nvs) => nvs,
            Err(e) => {
                warn!("NVS {} open failed: {}", prefs::NAMESPACE, e);
                return None;
            }
        };
        let bg = nvs.get_u16(prefs::KEY_BG).unwrap_or(None);
        let fg = nvs.get_u16(prefs::KEY_FG).unwrap_or(None);
        let font = nvs.get_u8(prefs::KEY_FONT).unwrap_or(None);
        let size = nvs.get_u8(prefs::KEY_SIZE).unwrap_or(None);
        if bg.is_none() && fg.is_none() && font.is_none() && size.is_none() {
            info!("NVS {}: nothing stored, using defaults", prefs::NAMESPACE);
            return None;
        }
        Some(UiPreferences::from_stored(bg, fg, font, size))
    }

    fn save(&mut self, p: &UiPreferences) -> Result<()> {
        let mut nvs = self.open()?;
        nvs.set_u16(prefs::KEY_BG, p.background_color)?;
        nvs.set_u16(prefs::KEY_FG, p.foreground_color)?;
        nvs.set_u8(prefs::KEY_FONT, p.font_id)?;
        nvs.set_u8(prefs::KEY_SIZE, p.size_multiplier)?;
        info!(
            "NVS saved {}: bg={:#06x} fg={:#06x} font={} size={}",
            prefs::NAMESPACE, p.background_color, p.foreground_color, p.font_id, p.size_multiplier
        );
        Ok(())
    }
}
