//! The render task: reads the latest grid power and drives the strip.

use std::sync::Arc;
use std::time::Instant;

use esp_idf_hal::cpu::Core;
use gridbar_meter_lib::GridCell;
use gridbar_render_lib::StripRenderer;
use log::{debug, error, info, warn};

use crate::leds::LedStrip;
use crate::thread_util::spawn_named_on_core;
use crate::watchdog::WatchdogHandle;

/// Seed for the sparkle generator from the hardware RNG
fn hardware_seed() -> u16 {
    // Low half of a 32-bit hardware random word
    // SAFETY: esp_random only reads the RNG register and may be called from
    // any task at any time
    #[allow(clippy::cast_possible_truncation)]
    let seed = unsafe { esp_idf_svc::sys::esp_random() } as u16;
    seed
}

/// Milliseconds since `start`, wrapping like a 32-bit millis counter
fn millis_since(start: Instant) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let ms = start.elapsed().as_millis() as u32;
    ms
}

/// Start the render loop on core 1.
///
/// The task owns the strip; frames are paced by the strip's refresh limit.
/// It runs for the life of the device: driver and watchdog failures are
/// logged, never fatal.
pub fn start_render_task(strip: LedStrip, cell: Arc<GridCell>) {
    spawn_named_on_core(c"render", Core::Core1, move || {
        render_loop(strip, &cell);
    });
}

fn render_loop(mut strip: LedStrip, cell: &GridCell) -> ! {
    let watchdog = WatchdogHandle::register(c"render")
        .inspect_err(|e| error!("Render task running without watchdog: {e:?}"))
        .ok();
    let seed = hardware_seed();
    let mut renderer = StripRenderer::new(seed);
    info!("Render task started (seed {seed:#06x})");

    if let Err(e) = strip.clear() {
        warn!("Initial LED clear failed: {e:?}");
    }

    let start = Instant::now();
    loop {
        if let Some(watchdog) = &watchdog {
            watchdog.feed();
        }
        let power = cell.snapshot();
        let frame = renderer.render(power.watts(), millis_since(start));
        // A dropped frame is replaced by the next one a few tens of ms later
        if let Err(e) = strip.show(frame) {
            debug!("LED write failed: {e:?}");
        }
    }
}
