//! Per-pixel hue tables for the two flow directions.
//!
//! Hues are on the 8-bit color wheel (0 = red, 96 = green). Each table walks
//! the hue forward a few steps per pixel so the far end of the bar reads
//! slightly warmer than the start.

/// Red on the 8-bit hue wheel
pub const HUE_RED: u8 = 0;
/// Green on the 8-bit hue wheel
pub const HUE_GREEN: u8 = 96;
/// Hue advance per pixel
pub const HUE_STEP: u8 = 3;
/// Export ramp starts this far before pure green
pub const EXPORT_HUE_OFFSET: u8 = 10;

/// Direction of power at the grid coupling point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Zero or negative watts: the house feeds the grid
    Export,
    /// Positive watts: the house draws from the grid
    Import,
}

impl Flow {
    /// Classify a signed power reading. Zero counts as export.
    #[must_use]
    pub fn of(watts: f32) -> Self {
        if watts > 0.0 {
            Self::Import
        } else {
            Self::Export
        }
    }
}

/// Fixed hue for each of the `N` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette<const N: usize> {
    hues: [u8; N],
}

impl<const N: usize> Palette<N> {
    /// Hues `base, base + step, base + 2·step, …` wrapping around the wheel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn ramp(base: u8, step: u8) -> Self {
        Self {
            hues: core::array::from_fn(|i| base.wrapping_add((i as u8).wrapping_mul(step))),
        }
    }

    #[must_use]
    pub fn hue(&self, index: usize) -> u8 {
        self.hues[index]
    }

    #[must_use]
    pub const fn hues(&self) -> &[u8; N] {
        &self.hues
    }
}

/// The export and import palettes, built once and never modified.
#[derive(Debug, Clone)]
pub struct Palettes<const N: usize> {
    export: Palette<N>,
    import: Palette<N>,
}

impl<const N: usize> Palettes<N> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            export: Palette::ramp(HUE_GREEN - EXPORT_HUE_OFFSET, HUE_STEP),
            import: Palette::ramp(HUE_RED, HUE_STEP),
        }
    }

    #[must_use]
    pub const fn get(&self, flow: Flow) -> &Palette<N> {
        match flow {
            Flow::Export => &self.export,
            Flow::Import => &self.import,
        }
    }
}

impl<const N: usize> Default for Palettes<N> {
    fn default() -> Self {
        Self::new()
    }
}
