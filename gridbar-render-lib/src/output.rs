//! Output stage between the renderer and the strip driver.
//!
//! Applies the strip's color correction and global brightness, optional
//! temporal binary dithering, and paces `show` calls to the strip's maximum
//! refresh rate.

use std::time::{Duration, Instant};

use rgb::RGB8;

use crate::math8::{qadd8, scale8};

/// Correction for typical SMD5050 strips (green and blue run hot)
pub const TYPICAL_LED_STRIP: RGB8 = RGB8::new(0xFF, 0xB0, 0xF0);
/// No correction
pub const UNCORRECTED: RGB8 = RGB8::new(0xFF, 0xFF, 0xFF);

/// Number of temporal dithering steps, as a power of two
const DITHER_BITS: u8 = 3;

/// Temporal dithering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dither {
    Disabled,
    /// Alternate the rounding of scaled channels across frames
    Binary,
}

/// Strip output configuration, applied once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripSettings {
    pub correction: RGB8,
    pub brightness: u8,
    /// Upper bound on `show` calls per second (0 = unlimited)
    pub max_refresh_hz: u16,
    pub dither: Dither,
}

impl Default for StripSettings {
    fn default() -> Self {
        Self {
            correction: TYPICAL_LED_STRIP,
            brightness: 255,
            max_refresh_hz: 25,
            dither: Dither::Binary,
        }
    }
}

/// Per-channel scale combining color correction and brightness.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn color_adjustment(correction: RGB8, brightness: u8) -> RGB8 {
    let channel = |c: u8| -> u8 {
        if c == 0 || brightness == 0 {
            0
        } else {
            // (c + 1) · 256 · brightness / 65536
            ((u32::from(c) + 1) * u32::from(brightness) / 256) as u8
        }
    };
    RGB8::new(
        channel(correction.r),
        channel(correction.g),
        channel(correction.b),
    )
}

/// Scales frames for the wire.
#[derive(Debug, Clone)]
pub struct OutputStage {
    adjustment: RGB8,
    dither: Dither,
    frame_counter: u8,
}

impl OutputStage {
    #[must_use]
    pub fn new(settings: &StripSettings) -> Self {
        Self {
            adjustment: color_adjustment(settings.correction, settings.brightness),
            dither: settings.dither,
            frame_counter: 0,
        }
    }

    #[must_use]
    pub const fn adjustment(&self) -> RGB8 {
        self.adjustment
    }

    /// Produce the corrected frame to send to the strip.
    pub fn process<const N: usize>(&mut self, frame: &[RGB8; N]) -> [RGB8; N] {
        let scale = [self.adjustment.r, self.adjustment.g, self.adjustment.b];
        let (mut offset, step) = match self.dither {
            Dither::Disabled => ([0; 3], [0; 3]),
            Dither::Binary => self.next_dither(scale),
        };

        core::array::from_fn(|i| {
            let px = frame[i];
            let channels = [px.r, px.g, px.b];
            let mut out = [0u8; 3];
            for lane in 0..3 {
                let mut value = channels[lane];
                if value != 0 {
                    value = qadd8(value, offset[lane]);
                }
                out[lane] = scale8(value, scale[lane]);
                offset[lane] = step[lane].wrapping_sub(offset[lane]);
            }
            RGB8::new(out[0], out[1], out[2])
        })
    }

    /// Advance the frame counter and derive this frame's per-channel dither
    /// offset and the value it alternates against.
    #[allow(clippy::cast_possible_truncation)]
    fn next_dither(&mut self, scale: [u8; 3]) -> ([u8; 3], [u8; 3]) {
        self.frame_counter = self.frame_counter.wrapping_add(1) & ((1 << DITHER_BITS) - 1);
        let r = self.frame_counter;

        // Bit-reverse the counter into the top bits so consecutive frames
        // spread across the range.
        let mut q = 0u8;
        if r & 0x01 != 0 {
            q |= 0x80;
        }
        if r & 0x02 != 0 {
            q |= 0x40;
        }
        if r & 0x04 != 0 {
            q |= 0x20;
        }
        q += 0x01 << (7 - DITHER_BITS);

        let mut offset = [0u8; 3];
        let mut step = [0u8; 3];
        for lane in 0..3 {
            let s = scale[lane];
            let mut e = if s == 0 { 0 } else { (256 / u16::from(s) + 1) as u8 };
            let mut d = scale8(q, e);
            if d > 0 {
                d -= 1;
            }
            if e > 0 {
                e -= 1;
            }
            offset[lane] = d;
            step[lane] = e;
        }
        (offset, step)
    }
}

/// Paces frame output to a maximum refresh rate.
#[derive(Debug, Clone)]
pub struct RefreshLimiter {
    min_interval: Duration,
    last_show: Option<Instant>,
}

impl RefreshLimiter {
    #[must_use]
    pub fn new(max_refresh_hz: u16) -> Self {
        let min_interval = if max_refresh_hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(1_000_000 / u64::from(max_refresh_hz))
        };
        Self {
            min_interval,
            last_show: None,
        }
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// How long to wait at `now` before the next frame may be shown.
    #[must_use]
    pub fn wait_time(&self, now: Instant) -> Duration {
        self.last_show.map_or(Duration::ZERO, |last| {
            self.min_interval.saturating_sub(now.saturating_duration_since(last))
        })
    }

    /// Record that a frame went out at `now`.
    pub fn mark_shown(&mut self, now: Instant) {
        self.last_show = Some(now);
    }
}
