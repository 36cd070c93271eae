//! Grid power bar rendering for GridBar
//!
//! This library turns a signed grid power reading into LED frames: a
//! palette-shaded bar whose length follows the magnitude, smoothed over time,
//! with a breathing fade and an occasional traveling sparkle. It also holds
//! the output stage (color correction, dithering and refresh pacing) used in
//! front of the strip driver. It is hardware-agnostic and can be tested
//! without embedded hardware.

pub mod math8;
pub mod output;
pub mod palette;
pub mod pixel;
pub mod renderer;
pub mod sparkle;

pub use output::{Dither, OutputStage, RefreshLimiter, StripSettings};
pub use palette::Flow;
pub use renderer::{Renderer, FULL_SCALE_WATTS};
pub use rgb::RGB8;
pub use sparkle::Sparkle;

/// Number of pixels on the GridBar strip
pub const STRIP_LEN: usize = 10;

/// Renderer sized for the GridBar strip
pub type StripRenderer = Renderer<STRIP_LEN>;
