use anyhow::Result;
use embedded_svc::http::client::Client;
use embedded_svc::http::Method;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::wifi::EspWifi;
use log::{debug, info, warn};

use super::wifi;
use crate::board::HTTP_TIMEOUT_MS;
use crate::hal::{HttpResponse, QuoteTransport};
use crate::quote::MAX_BODY_BYTES;

/// HTTPS GET over the station interface. Server certificates are not
/// verified (`CONFIG_ESP_TLS_SKIP_SERVER_CERT_VERIFY`).
pub struct HttpTransport {
    wifi: Option<Box<EspWifi<'static>>>,
    sysloop: EspSystemEventLoop,
}

impl HttpTransport {
    pub fn new(wifi: Box<EspWifi<'static>>, sysloop: EspSystemEventLoop) -> Self {
        Self { wifi: Some(wifi), sysloop }
    }

    /// Transport with no station; every fetch reports the missing link.
    pub fn offline(sysloop: EspSystemEventLoop) -> Self {
        Self { wifi: None, sysloop }
    }
}

impl QuoteTransport for HttpTransport {
    fn link_up(&self) -> bool {
        match &self.wifi {
            Some(w) => match w.is_connected() {
                Ok(up) => up,
                Err(e) => {
                    warn!("WiFi is_connected failed: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    fn reconnect(&mut self) -> bool {
        let Some(w) = self.wifi.as_mut() else {
            return false;
        };
        match wifi::reconnect_existing(w, self.sysloop.clone()) {
            Ok(Some(ip)) => {
                info!("WiFi rejoined, IP: {}", ip);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("WiFi rejoin failed: {}", e);
                false
            }
        }
    }

    fn get(&mut self, url: &str) -> Result<HttpResponse> {
        let config = Configuration {
            timeout: Some(std::time::Duration::from_millis(HTTP_TIMEOUT_MS as u64)),
            ..Default::default()
        };

        let connection = EspHttpConnection::new(&config)?;
        let mut client = Client::wrap(connection);

        let mut response = client.request(Method::Get, url, &[])?.submit()?;
        let status = response.status();
        debug!(
            "HTTP GET {} -> status {}",
            url.chars().take(80).collect::<String>(),
            status
        );

        // one byte past the cap is enough for the caller to reject it
        let mut body: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buf[..n]);
            if body.len() > MAX_BODY_BYTES {
                break;
            }
        }

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
