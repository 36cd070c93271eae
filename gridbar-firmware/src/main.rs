use std::sync::Arc;
use std::thread::sleep;
use std::time::Instant;

use anyhow::Result;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use gridbar_meter_lib::{Cadence, GridCell, Sampler, SAMPLE_INTERVAL};
use gridbar_render_lib::StripSettings;
use log::{info, warn};

mod config;
mod leds;
mod meter;
mod render;
mod thread_util;
mod watchdog;
mod wifi;

use crate::watchdog::WatchdogHandle;
use config::{Config, POWER_UP_DELAY};
use leds::LedStrip;
use meter::FroniusMeter;
use wifi::Link;

/// Firmware version from `git describe`
pub const VERSION: &str = env!("GIT_VERSION");

fn main() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Let the strip's supply settle before the first write
    sleep(POWER_UP_DELAY);

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Starting gridbar firmware {VERSION}...");

    let config = Config::from_build_env();
    let level = config.log_level.as_level_filter();
    if let Err(e) = esp_idf_svc::log::set_target_level("*", level) {
        warn!("Failed to set log level: {e}");
    } else {
        info!("Log level set to {:?}", config.log_level);
    }

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    info!("Initializing WiFi...");
    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    let link = wifi::start(&config, wifi)?;

    let cell = Arc::new(GridCell::new());
    let meter = FroniusMeter::new(config.meter_url())?;
    info!("Sampling {} every {}s", meter.url(), SAMPLE_INTERVAL.as_secs());
    let sampler = Sampler::new(meter, Arc::clone(&cell));

    info!("Initializing LED strip on GPIO {}...", config.led_gpio);
    // SAFETY: the pin number is range-checked by Config::validate and is not
    // claimed by any other driver
    let led_pin = unsafe { AnyIOPin::new(i32::from(config.led_gpio)) };
    let strip = LedStrip::new(led_pin, peripherals.rmt.channel0, &StripSettings::default())?;
    render::start_render_task(strip, cell);

    info!("All systems running!");
    run_sampler(sampler, &link)
}

/// Sampling loop on the main task. Never returns unless watchdog setup fails.
fn run_sampler(mut sampler: Sampler<FroniusMeter>, link: &Link) -> Result<()> {
    let watchdog = WatchdogHandle::register(c"sampler")?;
    let mut cadence = Cadence::new(SAMPLE_INTERVAL);

    loop {
        watchdog.feed();
        let now = Instant::now();
        if cadence.ready(now) {
            sampler.sample(wifi::is_up(link));
        } else {
            sleep(cadence.time_until_due(now));
        }
    }
}
