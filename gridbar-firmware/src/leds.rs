use std::thread::sleep;
use std::time::Instant;

use anyhow::Result;
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::rmt::{RmtChannel, TxRmtDriver};
use gridbar_render_lib::{OutputStage, RefreshLimiter, StripSettings, RGB8, STRIP_LEN};
use log::debug;
use smart_leds::SmartLedsWrite;
use ws2812_esp32_rmt_driver::Ws2812Esp32Rmt;

/// The WS2812B strip behind its output stage.
///
/// `show` applies color correction, brightness and dithering, then holds the
/// caller back to the configured refresh rate. The driver emits GRB order.
pub struct LedStrip {
    driver: Ws2812Esp32Rmt<'static>,
    output: OutputStage,
    limiter: RefreshLimiter,
}

impl LedStrip {
    pub fn new<C: RmtChannel, P: OutputPin>(
        pin: impl Peripheral<P = P> + 'static,
        channel: impl Peripheral<P = C> + 'static,
        settings: &StripSettings,
    ) -> Result<Self> {
        debug!("Creating LED strip: {STRIP_LEN} pixels, {settings:?}");
        // Extra RMT memory blocks keep Wi-Fi interrupts from starving the
        // transmitter mid-frame (10 LEDs x 24 items fit in 4 x 64)
        let config = TransmitConfig::new().clock_divider(1).mem_block_num(4);
        let tx_driver = TxRmtDriver::new(channel, pin, &config)?;
        let driver = Ws2812Esp32Rmt::new_with_rmt_driver(tx_driver)?;

        Ok(Self {
            driver,
            output: OutputStage::new(settings),
            limiter: RefreshLimiter::new(settings.max_refresh_hz),
        })
    }

    /// Push one frame, waiting first if the previous one went out too recently.
    pub fn show(&mut self, frame: &[RGB8; STRIP_LEN]) -> Result<()> {
        let wait = self.limiter.wait_time(Instant::now());
        if !wait.is_zero() {
            sleep(wait);
        }
        let pixels = self.output.process(frame);
        self.driver.write(pixels.iter().copied())?;
        self.limiter.mark_shown(Instant::now());
        Ok(())
    }

    /// Turn every pixel off, bypassing the refresh limit.
    pub fn clear(&mut self) -> Result<()> {
        self.driver
            .write(std::iter::repeat(RGB8::default()).take(STRIP_LEN))?;
        Ok(())
    }
}
