//! Quantized scale factors
//!
//! Grids are keyed by scale. Keying a map by `f32` invites equality bugs when
//! "the same" scale is recomputed later, so the key stores millionths of the
//! factor, which is stable to hash and compare.

/// Scale factor quantized to millionths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScaleKey(u32);

impl ScaleKey {
    #[must_use]
    pub fn from_factor(factor: f32) -> Self {
        Self((factor.max(0.0) * 1_000_000.0).round() as u32)
    }

    /// The scale factor this key quantizes.
    #[must_use]
    pub fn factor(&self) -> f32 {
        self.0 as f32 / 1_000_000.0
    }

    #[must_use]
    pub const fn millionths(&self) -> u32 {
        self.0
    }
}
