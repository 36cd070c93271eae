//! 8-bit fixed-point helpers for LED animation.
//!
//! Integer approximations of scaling, blending and periodic waveforms so the
//! per-frame path stays cheap. Waveforms work on a 0-255 "angle" where 256 is
//! one full period. Beat generators take the current and origin timestamps in
//! milliseconds as `u32` and wrap the same way a 32-bit millisecond counter
//! does.

/// Scale an 8-bit value by `scale / 256`, where a scale of 255 is identity.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Like [`scale8`], but a non-zero value scaled by a non-zero factor never
/// reaches zero.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn scale8_video(value: u8, scale: u8) -> u8 {
    let scaled = ((value as u16 * scale as u16) >> 8) as u8;
    if value != 0 && scale != 0 {
        scaled + 1
    } else {
        scaled
    }
}

/// Add two 8-bit values, saturating at 255.
#[inline]
#[must_use]
pub const fn qadd8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

/// Blend `a` toward `b` by `amount_of_b / 256`.
///
/// `blend8(a, a, x) == a` for every `x`, so a pixel already at its target
/// stays put.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn blend8(a: u8, b: u8, amount_of_b: u8) -> u8 {
    let a = a as i32;
    let b = b as i32;
    // (a * 257 with b in the low byte) + (b - a) * amount
    let partial = (a << 8) + b + (b - a) * amount_of_b as i32;
    (partial >> 8) as u8
}

/// Slope/offset pairs for the four 16-step sections of a quarter sine.
const SIN8_SECTIONS: [u8; 8] = [0, 49, 49, 41, 90, 27, 117, 10];

/// Fast 8-bit sine: `theta` 0-255 maps to one full period, output 1-255
/// centered on 128.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub const fn sin8(theta: u8) -> u8 {
    let mut offset = theta;
    if theta & 0x40 != 0 {
        offset = 255 - offset;
    }
    offset &= 0x3F;

    let mut sec_offset = offset & 0x0F;
    if theta & 0x40 != 0 {
        sec_offset += 1;
    }

    let section = (offset >> 4) as usize;
    let base = SIN8_SECTIONS[section * 2];
    let slope = SIN8_SECTIONS[section * 2 + 1];

    let mx = ((slope as u16 * sec_offset as u16) >> 4) as u8;
    let mut y = mx.wrapping_add(base) as i8;
    if theta & 0x80 != 0 {
        y = y.wrapping_neg();
    }
    (y as u8).wrapping_add(128)
}

/// Triangle wave: rises 0 → 254 over the first half period, falls back after.
#[inline]
#[must_use]
pub const fn triwave8(angle: u8) -> u8 {
    let folded = if angle & 0x80 != 0 { 255 - angle } else { angle };
    folded << 1
}

/// Cubic ease-in/ease-out on 0-255.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn ease8_in_out_cubic(i: u8) -> u8 {
    let ii = scale8(i, i);
    let iii = scale8(ii, i);
    let r1 = 3 * ii as u16 - 2 * iii as u16;
    if r1 & 0x100 != 0 {
        255
    } else {
        r1 as u8
    }
}

/// Triangle wave shaped by a cubic ease, lingering near both extremes.
#[inline]
#[must_use]
pub const fn cubicwave8(angle: u8) -> u8 {
    ease8_in_out_cubic(triwave8(angle))
}

/// Remap 0-255 onto `start..=end` (end inclusive only for an input of 255).
#[inline]
#[must_use]
pub const fn map8(value: u8, start: u8, end: u8) -> u8 {
    start.wrapping_add(scale8(value, end.wrapping_sub(start)))
}

/// 16-bit sawtooth advancing at `bpm88` beats per minute (Q8.8) since `timebase_ms`.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn beat88(bpm88: u16, now_ms: u32, timebase_ms: u32) -> u16 {
    let elapsed = now_ms.wrapping_sub(timebase_ms);
    (elapsed.wrapping_mul(bpm88 as u32).wrapping_mul(280) >> 16) as u16
}

/// 16-bit sawtooth at `bpm` beats per minute; values below 256 are whole BPM.
#[inline]
#[must_use]
pub const fn beat16(bpm: u16, now_ms: u32, timebase_ms: u32) -> u16 {
    let bpm88 = if bpm < 256 { bpm << 8 } else { bpm };
    beat88(bpm88, now_ms, timebase_ms)
}

/// 8-bit sawtooth at `bpm` beats per minute since `timebase_ms`.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn beat8(bpm: u16, now_ms: u32, timebase_ms: u32) -> u8 {
    (beat16(bpm, now_ms, timebase_ms) >> 8) as u8
}

/// Sine wave at `bpm` oscillating between `lowest` and `highest`.
#[inline]
#[must_use]
pub const fn beatsin8(bpm: u16, lowest: u8, highest: u8, now_ms: u32, timebase_ms: u32) -> u8 {
    let beat = beat8(bpm, now_ms, timebase_ms);
    let range = highest.wrapping_sub(lowest);
    lowest.wrapping_add(scale8(sin8(beat), range))
}

/// Linear congruential 16-bit generator.
///
/// Cheap and full-period (every `u16` appears exactly once per 65536 draws),
/// which is all the sparkle trigger needs.
#[derive(Debug, Clone)]
pub struct Random16 {
    seed: u16,
}

impl Random16 {
    pub const DEFAULT_SEED: u16 = 1337;

    #[must_use]
    pub const fn new(seed: u16) -> Self {
        Self { seed }
    }

    /// Next raw value.
    pub fn next_u16(&mut self) -> u16 {
        self.seed = self.seed.wrapping_mul(2053).wrapping_add(13849);
        self.seed
    }

    /// Uniform value in `[0, limit)`; always 0 when `limit` is 0.
    #[allow(clippy::cast_possible_truncation)]
    pub fn below(&mut self, limit: u16) -> u16 {
        ((u32::from(self.next_u16()) * u32::from(limit)) >> 16) as u16
    }
}

impl Default for Random16 {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}
