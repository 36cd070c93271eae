//! Traveling white highlight over the lit part of the bar.
//!
//! While idle, each frame rolls `random16(limit)` and starts a sparkle on a
//! zero. The limit shrinks as the magnitude grows, so a bar near full scale
//! sparkles often and an almost dark one rarely does. An active sparkle sweeps
//! from pixel 0 toward the end of the strip following an eased 60 BPM wave and
//! stops once the wave reaches the terminal position.

use rgb::RGB8;

use crate::math8::{beat8, cubicwave8, map8, Random16};
use crate::pixel::{fade_light_by, WHITE};

/// Sweep rate of an active sparkle
pub const SPARKLE_BPM: u16 = 60;
/// One full beat at [`SPARKLE_BPM`]; an active sparkle never outlives it
pub const SPARKLE_PERIOD_MS: u32 = 60_000 / SPARKLE_BPM as u32;
/// Trigger limit at full scale
pub const TRIGGER_LIMIT_MIN: f32 = 512.0;
/// Extra trigger limit at zero magnitude
pub const TRIGGER_LIMIT_RANGE: f32 = 4096.0;
/// Fade applied to the highlight at pixel 0
pub const HIGHLIGHT_FADE_BASE: u8 = 162;
/// Additional fade per pixel along the strip
pub const HIGHLIGHT_FADE_STEP: u8 = 10;

/// Sparkle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sparkle {
    #[default]
    Idle,
    /// Sweeping, with the animation phase measured from `timebase_ms`
    Active { timebase_ms: u32 },
}

/// Exclusive upper bound of the per-frame trigger roll for a magnitude ratio
/// in `[0, 1]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn trigger_limit(ratio: f32) -> u16 {
    let ratio = ratio.clamp(0.0, 1.0);
    (TRIGGER_LIMIT_MIN + TRIGGER_LIMIT_RANGE * (1.0 - ratio)) as u16
}

/// Sweep position for a sparkle started at `timebase_ms`.
///
/// Returns a value in `0..=strip_len`; `strip_len` itself is the terminal
/// position.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn sweep_position(timebase_ms: u32, now_ms: u32, strip_len: usize) -> u8 {
    let end = strip_len.min(usize::from(u8::MAX)) as u8;
    let phase = cubicwave8(beat8(SPARKLE_BPM, now_ms, timebase_ms));
    map8(phase, 0, end)
}

/// Highlight color at sweep position `pos`: white, dimmer toward the tail.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn highlight(pos: usize) -> RGB8 {
    let step = pos.min(usize::from(u8::MAX)) as u8;
    let fade = HIGHLIGHT_FADE_BASE.saturating_add(HIGHLIGHT_FADE_STEP.saturating_mul(step));
    fade_light_by(WHITE, fade)
}

impl Sparkle {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Advance by one frame.
    ///
    /// When idle this rolls the trigger (a hit only arms the sparkle, nothing
    /// is drawn until the next frame). When active it returns the pixel to
    /// highlight, or returns to idle once the sweep reaches `strip_len` or a
    /// full beat has elapsed since `timebase_ms`.
    pub fn step(
        &mut self,
        ratio: f32,
        now_ms: u32,
        strip_len: usize,
        rng: &mut Random16,
    ) -> Option<usize> {
        match *self {
            Self::Idle => {
                if rng.below(trigger_limit(ratio)) == 0 {
                    *self = Self::Active {
                        timebase_ms: now_ms,
                    };
                }
                None
            }
            Self::Active { timebase_ms } => {
                // Frames can be late; the beat wraps after one period and
                // would restart the sweep.
                if now_ms.wrapping_sub(timebase_ms) >= SPARKLE_PERIOD_MS {
                    *self = Self::Idle;
                    return None;
                }
                let pos = usize::from(sweep_position(timebase_ms, now_ms, strip_len));
                if pos >= strip_len {
                    *self = Self::Idle;
                    None
                } else {
                    Some(pos)
                }
            }
        }
    }
}
