//! Per-pixel color operations on [`RGB8`].

use rgb::RGB8;

use crate::math8::{blend8, scale8, scale8_video};

pub const BLACK: RGB8 = RGB8::new(0, 0, 0);
pub const WHITE: RGB8 = RGB8::new(255, 255, 255);

/// Convert an 8-bit hue/saturation/value triple to RGB on the "rainbow"
/// wheel.
///
/// Unlike an even six-sector spectrum, the rainbow wheel gives yellow and
/// orange a wider band so hue steps look evenly spaced: 0 is red, 64 yellow,
/// 96 green, 160 blue. Value is applied on a video curve (squared, never
/// rounding a non-zero input to black) and saturation lifts toward white.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub const fn hsv(hue: u8, sat: u8, val: u8) -> RGB8 {
    let offset8 = (hue & 0x1F) << 3;
    let third = scale8(offset8, 85);
    let two_thirds = scale8(offset8, 170);

    let (mut r, mut g, mut b) = match hue >> 5 {
        // red -> orange
        0 => (255 - third, third, 0),
        // orange -> yellow
        1 => (171, 85 + third, 0),
        // yellow -> green
        2 => (171 - two_thirds, 170 + third, 0),
        // green -> aqua
        3 => (0, 255 - third, third),
        // aqua -> blue
        4 => (0, 171 - two_thirds, 85 + two_thirds),
        // blue -> purple
        5 => (third, 0, 255 - third),
        // purple -> pink
        6 => (85 + third, 0, 171 - third),
        // pink -> red
        _ => (170 + third, 0, 85 - third),
    };

    if sat == 0 {
        r = 255;
        g = 255;
        b = 255;
    } else if sat != 255 {
        let desat = scale8_video(255 - sat, 255 - sat);
        let sat_scale = 255 - desat;
        r = scale8(r, sat_scale) + desat;
        g = scale8(g, sat_scale) + desat;
        b = scale8(b, sat_scale) + desat;
    }

    if val != 255 {
        let val = scale8_video(val, val);
        if val == 0 {
            return BLACK;
        }
        r = scale8(r, val);
        g = scale8(g, val);
        b = scale8(b, val);
    }

    RGB8::new(r, g, b)
}

/// Scale every channel by `scale / 256` (255 is identity).
#[inline]
#[must_use]
pub const fn nscale8(color: RGB8, scale: u8) -> RGB8 {
    RGB8::new(
        scale8(color.r, scale),
        scale8(color.g, scale),
        scale8(color.b, scale),
    )
}

/// Darken a color by `amount / 256`; 0 leaves it unchanged.
#[inline]
#[must_use]
pub const fn fade_light_by(color: RGB8, amount: u8) -> RGB8 {
    nscale8(color, 255 - amount)
}

/// Blend `existing` toward `overlay` in place by `amount / 256`.
pub fn nblend(existing: &mut RGB8, overlay: RGB8, amount: u8) {
    match amount {
        0 => {}
        255 => *existing = overlay,
        _ => {
            existing.r = blend8(existing.r, overlay.r, amount);
            existing.g = blend8(existing.g, overlay.g, amount);
            existing.b = blend8(existing.b, overlay.b, amount);
        }
    }
}

/// Whether any channel is non-zero.
#[inline]
#[must_use]
pub const fn is_lit(color: RGB8) -> bool {
    color.r != 0 || color.g != 0 || color.b != 0
}
