//! Station-mode Wi-Fi with background reconnect.
//!
//! The connection manager thread owns the driver and publishes link state
//! through an [`AtomicLinkState`]; the sampler only ever reads that flag, so
//! a reconnect attempt never blocks sampling or rendering.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use atomic_enum::atomic_enum;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::thread_util::spawn_named;
use crate::watchdog::WatchdogHandle;

/// How often the manager checks the association
const POLL_INTERVAL_MS: u32 = 1000;

/// Pause between failed connection attempts
const RETRY_DELAY_MS: u32 = 5000;

/// Upper bound on waiting for DHCP after association, in 3 s slices
const IP_WAIT_SLICES: u32 = 5;

#[atomic_enum]
#[derive(PartialEq, Eq)]
pub enum LinkState {
    Down,
    Up,
}

/// Shared view of the station link
pub type Link = Arc<AtomicLinkState>;

pub fn is_up(link: &AtomicLinkState) -> bool {
    link.load(Ordering::Relaxed) == LinkState::Up
}

fn client_configuration(config: &Config) -> Configuration {
    let auth_method = if config.wifi_password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    // Oversized credentials were already reported by Config::validate
    Configuration::Client(ClientConfiguration {
        ssid: config.wifi_ssid.try_into().unwrap_or_default(),
        password: config.wifi_password.try_into().unwrap_or_default(),
        auth_method,
        ..Default::default()
    })
}

/// Configure and start the station, then hand the driver to the connection
/// manager thread.
///
/// Returns immediately; the link starts out [`LinkState::Down`].
pub fn start(config: &Config, mut wifi: BlockingWifi<EspWifi<'static>>) -> Result<Link> {
    info!("Starting WiFi STA for '{}'", config.wifi_ssid);
    wifi.set_configuration(&client_configuration(config))?;
    wifi.start()?;

    let link = Arc::new(AtomicLinkState::new(LinkState::Down));
    let manager_link = Arc::clone(&link);
    let ssid = config.wifi_ssid;
    spawn_named(c"wifi_manager", move || {
        if let Err(e) = connection_manager(&mut wifi, &manager_link, ssid) {
            error!("WiFi manager stopped: {e:?}");
        }
    });

    Ok(link)
}

/// Try to associate and obtain an address. Feeds the watchdog while waiting.
fn connect(
    wifi: &mut BlockingWifi<EspWifi<'static>>,
    ssid: &str,
    watchdog: &WatchdogHandle,
) -> bool {
    debug!("Connecting to '{ssid}'...");
    if let Err(e) = wifi.connect() {
        warn!("STA connection to '{ssid}' failed: {e:?}");
        return false;
    }

    // Wait for IP with watchdog-friendly polling
    for _ in 0..IP_WAIT_SLICES {
        watchdog.feed();
        let _ = wifi.ip_wait_while(
            || wifi.is_up().map(|up| !up),
            Some(Duration::from_secs(3)),
        );
        if wifi.is_up().unwrap_or(false) {
            match wifi.wifi().sta_netif().get_ip_info() {
                Ok(ip_info) => info!("WiFi connected to '{ssid}' with IP: {}", ip_info.ip),
                Err(e) => warn!("WiFi connected to '{ssid}' but IP info unavailable: {e:?}"),
            }
            return true;
        }
    }

    warn!("No IP from '{ssid}', disconnecting");
    if let Err(e) = wifi.disconnect() {
        debug!("Disconnect after failed DHCP: {e:?}");
    }
    false
}

/// Background task: connect, then watch the association and reconnect when
/// it drops.
fn connection_manager(
    wifi: &mut BlockingWifi<EspWifi<'static>>,
    link: &AtomicLinkState,
    ssid: &str,
) -> Result<()> {
    let watchdog = WatchdogHandle::register(c"wifi_manager")?;

    loop {
        watchdog.feed();

        if is_up(link) {
            FreeRtos::delay_ms(POLL_INTERVAL_MS);
            if !wifi.is_connected().unwrap_or(false) {
                warn!("WiFi disconnected from '{ssid}'");
                link.store(LinkState::Down, Ordering::Relaxed);
            }
            continue;
        }

        if connect(wifi, ssid, &watchdog) {
            link.store(LinkState::Up, Ordering::Relaxed);
            continue;
        }

        // Wait before next attempt
        for _ in 0..RETRY_DELAY_MS / POLL_INTERVAL_MS {
            FreeRtos::delay_ms(POLL_INTERVAL_MS);
            watchdog.feed();
        }
    }
}
