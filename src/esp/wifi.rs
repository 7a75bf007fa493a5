use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::info;

const CONNECT_ATTEMPTS: u32 = 5;
/// Fewer tries on rejoin; it blocks the control loop.
const RECONNECT_ATTEMPTS: u32 = 2;

pub struct WifiLink {
    pub wifi: Box<EspWifi<'static>>,
    /// Set once associated and addressed.
    pub ip_address: Option<String>,
}

/// Log association state from ESP-IDF internals.
fn log_wifi_diag(label: &str) {
    unsafe {
        let mut ap_info: esp_idf_sys::wifi_ap_record_t = core::mem::zeroed();
        let ap_rc = esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap_info);
        if ap_rc == esp_idf_sys::ESP_OK {
            let ssid = core::str::from_utf8(&ap_info.ssid)
                .unwrap_or("?")
                .trim_end_matches('\0');
            info!(
                "WiFi [{}]: assoc=YES rssi={} ch={} ssid={}",
                label, ap_info.rssi, ap_info.primary, ssid
            );
        } else {
            info!("WiFi [{}]: assoc=NO (ap_info err={})", label, ap_rc);
        }
    }
}

/// Bring up the station and try to join `ssid`. A failed join is not an
/// error: the quote loop rejoins before each fetch while the link is down.
pub fn connect_wifi(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    ssid: &str,
    password: &str,
) -> Result<WifiLink> {
    let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), None)?;

    let auth = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    let mut wifi_ssid = heapless::String::<32>::new();
    let mut wifi_pass = heapless::String::<64>::new();
    if wifi_ssid.push_str(ssid).is_err() {
        log::warn!("WiFi SSID longer than 32 bytes, truncated");
    }
    if wifi_pass.push_str(password).is_err() {
        log::warn!("WiFi password longer than 64 bytes, truncated");
    }

    esp_wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: wifi_ssid,
        password: wifi_pass,
        auth_method: auth,
        ..Default::default()
    }))?;

    let mut blocking_wifi = BlockingWifi::wrap(&mut esp_wifi, sysloop)?;

    blocking_wifi.start()?;
    info!("WiFi connecting to '{}'...", ssid);

    let ip_address = if join(&mut blocking_wifi, CONNECT_ATTEMPTS, "attempt") {
        wait_for_ip(&mut blocking_wifi)
    } else {
        log::warn!("WiFi failed after {} attempts; will retry before the next fetch", CONNECT_ATTEMPTS);
        None
    };

    // the EspWifi stays usable without the blocking wrapper
    drop(blocking_wifi);

    Ok(WifiLink {
        wifi: Box::new(esp_wifi),
        ip_address,
    })
}

/// Rejoin the configured AP after the link dropped. Returns the new IP.
pub fn reconnect_existing(
    wifi: &mut EspWifi<'static>,
    sysloop: EspSystemEventLoop,
) -> Result<Option<String>> {
    let mut blocking_wifi = BlockingWifi::wrap(wifi, sysloop)?;
    let _ = blocking_wifi.start();

    if !join(&mut blocking_wifi, RECONNECT_ATTEMPTS, "reconnect") {
        return Ok(None);
    }
    Ok(wait_for_ip(&mut blocking_wifi))
}

/// Up to `attempts` connects, with a full stop/start between failures.
fn join(blocking_wifi: &mut BlockingWifi<&mut EspWifi<'static>>, attempts: u32, label: &str) -> bool {
    for attempt in 1..=attempts {
        let t0 = super::now_ms();
        match blocking_wifi.connect() {
            Ok(_) => {
                info!(
                    "WiFi {} {} OK ({}ms)",
                    label,
                    attempt,
                    super::now_ms().wrapping_sub(t0)
                );
                log_wifi_diag(&format!("{} {} OK", label, attempt));
                return true;
            }
            Err(e) => {
                log::warn!(
                    "WiFi {} {}/{} failed after {}ms: {}",
                    label,
                    attempt,
                    attempts,
                    super::now_ms().wrapping_sub(t0),
                    e
                );
                log_wifi_diag(&format!("{} {} FAIL", label, attempt));

                if attempt < attempts {
                    // full stop/start resets the radio
                    let _ = blocking_wifi.disconnect();
                    blocking_wifi.stop().ok();
                    std::thread::sleep(std::time::Duration::from_millis(500));
                    blocking_wifi.start().ok();
                    std::thread::sleep(std::time::Duration::from_millis(300));
                }
            }
        }
    }
    false
}

fn wait_for_ip(blocking_wifi: &mut BlockingWifi<&mut EspWifi<'static>>) -> Option<String> {
    info!("WiFi associated, waiting for IP address...");
    if let Err(e) = blocking_wifi.wait_netif_up() {
        log::warn!("WiFi netif never came up: {}", e);
        return None;
    }
    match blocking_wifi.wifi().sta_netif().get_ip_info() {
        Ok(ip_info) => {
            info!("WiFi connected, IP: {}", ip_info.ip);
            Some(ip_info.ip.to_string())
        }
        Err(e) => {
            log::warn!("WiFi IP info unavailable: {}", e);
            None
        }
    }
}
