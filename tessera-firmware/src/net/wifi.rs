//! WiFi station bring-up
//!
//! Credentials are baked in at build time from `TESSERA_WIFI_SSID` and
//! `TESSERA_WIFI_PASS`.

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

const WIFI_SSID: &str = match option_env!("TESSERA_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};

const WIFI_PASS: &str = match option_env!("TESSERA_WIFI_PASS") {
    Some(pass) => pass,
    None => "",
};

const CONNECT_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Connect to the configured access point
///
/// The returned driver must be kept alive for the connection to stay up.
pub fn connect_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
) -> anyhow::Result<EspWifi<'static>> {
    if WIFI_SSID.is_empty() {
        return Err(anyhow!("TESSERA_WIFI_SSID was not set at build time"));
    }

    let mut esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
    let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sys_loop)?;

    let auth_method = if WIFI_PASS.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPAWPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID
            .try_into()
            .map_err(|_| anyhow!("wifi ssid too long"))?,
        password: WIFI_PASS
            .try_into()
            .map_err(|_| anyhow!("wifi password too long"))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    info!("WiFi started, connecting to `{}`", WIFI_SSID);

    let mut last_err = None;
    for attempt in 1..=CONNECT_ATTEMPTS {
        match wifi.connect().and_then(|_| wifi.wait_netif_up()) {
            Ok(()) => {
                last_err = None;
                break;
            }
            Err(e) => {
                warn!("WiFi connect attempt {}/{} failed: {}", attempt, CONNECT_ATTEMPTS, e);
                last_err = Some(e);
                let _ = wifi.disconnect();
                thread::sleep(RETRY_DELAY);
            }
        }
    }
    if let Some(e) = last_err {
        return Err(e).context("WiFi connection failed");
    }

    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi connected, IP {}", ip.ip);

    drop(wifi);
    Ok(esp_wifi)
}
