//! Build-time configuration.
//!
//! Everything is baked into the image from `GRIDBAR_*` environment variables
//! at compile time; there is no runtime settings store.

use std::str::FromStr;
use std::time::Duration;

use derive_more::{Display, Error};
use gridbar_meter_lib::meter_url;
use log::{warn, LevelFilter};

/// Delay before anything touches the strip, letting its supply settle
pub const POWER_UP_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on one inverter request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_WIFI_SSID: &str = "<your SSID>";
const DEFAULT_WIFI_PASS: &str = "<your password>";
const DEFAULT_INVERTER_HOST: &str = "fronius.localdomain";
const DEFAULT_LED_GPIO: u8 = 4;

/// 802.11 SSID limit (bytes)
const MAX_SSID_LEN: usize = 32;

/// WPA2 passphrase limits (bytes); 64 is the raw hex key form
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 64;

/// Highest GPIO number on the ESP32 family that can drive an output
const MAX_OUTPUT_GPIO: u8 = 48;

const fn env_or(value: Option<&'static str>, default: &'static str) -> &'static str {
    match value {
        Some(v) => v,
        None => default,
    }
}

const WIFI_SSID: &str = env_or(option_env!("GRIDBAR_WIFI_SSID"), DEFAULT_WIFI_SSID);
const WIFI_PASS: &str = env_or(option_env!("GRIDBAR_WIFI_PASS"), DEFAULT_WIFI_PASS);
const INVERTER_HOST: &str = env_or(option_env!("GRIDBAR_INVERTER_HOST"), DEFAULT_INVERTER_HOST);
const LED_GPIO: &str = env_or(option_env!("GRIDBAR_LED_GPIO"), "4");
const LOG_LEVEL: &str = env_or(option_env!("GRIDBAR_LOG_LEVEL"), "info");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Debug, Display, Error)]
#[display("unknown log level '{_0}'")]
pub struct UnknownLogLevel(#[error(not(source))] String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub wifi_ssid: &'static str,
    /// Empty means an open network
    pub wifi_password: &'static str,
    pub inverter_host: &'static str,
    /// Strip data pin
    pub led_gpio: u8,
    pub log_level: LogLevel,
}

impl Config {
    /// Config as baked in at build time, validated.
    ///
    /// Unparseable values fall back to their defaults with a warning, so a
    /// typo in the build environment still yields a working display.
    pub fn from_build_env() -> Self {
        let led_gpio = LED_GPIO.parse().unwrap_or_else(|_| {
            warn!("GRIDBAR_LED_GPIO '{LED_GPIO}' is not a pin number, using {DEFAULT_LED_GPIO}");
            DEFAULT_LED_GPIO
        });
        let log_level = LOG_LEVEL.parse().unwrap_or_else(|e| {
            warn!("GRIDBAR_LOG_LEVEL: {e}, using info");
            LogLevel::default()
        });

        let mut config = Self {
            wifi_ssid: WIFI_SSID,
            wifi_password: WIFI_PASS,
            inverter_host: INVERTER_HOST,
            led_gpio,
            log_level,
        };
        config.validate();
        config
    }

    pub fn validate(&mut self) {
        if self.wifi_ssid.is_empty() {
            warn!("WiFi SSID is empty, resetting to default");
            self.wifi_ssid = DEFAULT_WIFI_SSID;
        }
        if self.wifi_ssid == DEFAULT_WIFI_SSID {
            warn!("WiFi SSID was not set at build time (GRIDBAR_WIFI_SSID)");
        }
        if self.wifi_ssid.len() > MAX_SSID_LEN {
            warn!(
                "WiFi SSID is {} bytes, longer than {MAX_SSID_LEN}; association will fail",
                self.wifi_ssid.len()
            );
        }
        let pass_len = self.wifi_password.len();
        if pass_len > MAX_PASSWORD_LEN || (pass_len > 0 && pass_len < MIN_PASSWORD_LEN) {
            warn!(
                "WiFi password is {pass_len} bytes, outside {MIN_PASSWORD_LEN}..={MAX_PASSWORD_LEN}; association will fail"
            );
        }
        if self.inverter_host.trim().is_empty() {
            warn!("Inverter host is empty, resetting to default");
            self.inverter_host = DEFAULT_INVERTER_HOST;
        }
        if self.led_gpio > MAX_OUTPUT_GPIO {
            warn!(
                "LED GPIO {} out of range, resetting to {DEFAULT_LED_GPIO}",
                self.led_gpio
            );
            self.led_gpio = DEFAULT_LED_GPIO;
        }
    }

    /// Realtime meter URL on the configured inverter
    #[must_use]
    pub fn meter_url(&self) -> String {
        meter_url(self.inverter_host.trim())
    }
}
