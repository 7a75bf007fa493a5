#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use cyd_quote::app::App;
    use cyd_quote::board::BoardConfig;
    use cyd_quote::esp::display::{init_panel, BacklightPwm};
    use cyd_quote::esp::http_client::HttpTransport;
    use cyd_quote::esp::light::LdrAdc;
    use cyd_quote::esp::nvs::{self, NvsPrefsStore};
    use cyd_quote::esp::touch::init_touch;
    use cyd_quote::esp::{now_ms, wifi, EspClock};
    use cyd_quote::hal::{NoPrefsStore, PrefsStore};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
    use log::info;

    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let board = BoardConfig::active();
    info!("BOOT: cyd quote display v{} ({})", env!("CARGO_PKG_VERSION"), board.name);

    // ── 1. Peripherals ──
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. NVS config ──
    let cfg = {
        let nvs = EspNvs::new(nvs_partition.clone(), nvs::NS, true)?;
        nvs::Config::load(&nvs)
    };

    // ── 3. Backlight PWM (dark until the first duty is applied) ──
    let pwm = BacklightPwm::new(
        peripherals.ledc.channel0,
        peripherals.ledc.timer0,
        board.display.backlight,
    )?;

    // ── 4. Display ──
    let panel = init_panel(peripherals.spi2, &board.display)?;

    // ── 5. Light sensor ──
    let ldr = LdrAdc::new(&board.ldr)?;

    // ── 6. WiFi ──
    let transport = if cfg.wifi_configured() {
        match wifi::connect_wifi(peripherals.modem, sysloop.clone(), &cfg.wifi_ssid, &cfg.wifi_pass) {
            Ok(link) => {
                match &link.ip_address {
                    Some(ip) => info!("Quote source {} via {}", cfg.quote_url, ip),
                    None => log::warn!("WiFi not up at boot; first quote falls back to the placeholder"),
                }
                HttpTransport::new(link.wifi, sysloop.clone())
            }
            Err(e) => {
                log::warn!("WiFi failed: {}", e);
                HttpTransport::offline(sysloop.clone())
            }
        }
    } else {
        log::warn!("No WiFi SSID configured (set LOCAL_WIFI_SSID in wifi.local.rs)");
        HttpTransport::offline(sysloop.clone())
    };

    let mut app = App::new(board, panel, ldr, pwm, transport, &cfg.quote_url);

    // ── 7. Touch + settings persistence ──
    if let Some(pins) = board.touch {
        let touch = init_touch(peripherals.spi3, &pins, &board)?;
        let store: Box<dyn PrefsStore> = if board.persist_prefs {
            Box::new(NvsPrefsStore::new(nvs_partition.clone()))
        } else {
            Box::new(NoPrefsStore)
        };
        app = app.with_touch(Box::new(touch), store);
    }

    // ── 8. First quote, then the control loop ──
    app.boot(now_ms());
    app.run(&mut EspClock)
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("cyd-quote runs on ESP32; build with the espidf target (see .cargo/config.toml).");
}
