//! Style values, ranges, and platform trait normalization.
//!
//! CSS-like style coordinates used throughout the catalog:
//! - weight on the 1..=1000 scale (400 normal, 700 bold),
//! - stretch as a percentage (100% normal, 50%..200% extremes),
//! - slant as normal / italic / oblique-with-angle.
//!
//! A static face carries a degenerate `[v, v]` range for each axis; a
//! variable face carries its declared axis range. Platform providers
//! that report style as continuous traits (a float in -1.0..=1.0) are
//! normalized here through a fixed control-point table with linear
//! interpolation between anchors.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Font weight on the CSS 1..=1000 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const THIN: Self = Self(100);
    pub const LIGHT: Self = Self(300);
    /// CSS `font-weight: normal`.
    pub const NORMAL: Self = Self(400);
    pub const MEDIUM: Self = Self(500);
    /// CSS `font-weight: bold`.
    pub const BOLD: Self = Self(700);
    pub const BLACK: Self = Self(900);

    /// Creates a weight, clamping to the valid 1..=1000 range.
    #[inline]
    pub fn new(value: u16) -> Self {
        Self(value.clamp(1, 1000))
    }

    #[inline]
    pub fn value(self) -> u16 {
        self.0
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Font stretch as a percentage of normal glyph spacing.
///
/// 100.0 is normal; ultra-condensed is 50.0 and ultra-expanded 200.0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FontStretch(pub f32);

impl FontStretch {
    pub const ULTRA_CONDENSED: Self = Self(50.0);
    pub const CONDENSED: Self = Self(75.0);
    pub const NORMAL: Self = Self(100.0);
    pub const EXPANDED: Self = Self(125.0);
    pub const ULTRA_EXPANDED: Self = Self(200.0);

    #[inline]
    pub fn percentage(self) -> f32 {
        self.0
    }
}

impl Default for FontStretch {
    fn default() -> Self {
        Self::NORMAL
    }
}

// Stretch participates in cache keys; hash the raw bits.
impl Eq for FontStretch {}

impl Hash for FontStretch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Slant style: normal, italic, or oblique with an angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlantStyle {
    #[default]
    Normal,
    Italic,
    /// Oblique with a slant angle in whole degrees.
    Oblique(i16),
}

impl SlantStyle {
    /// Whether this slant belongs to the slanted class (italic or oblique).
    #[inline]
    pub fn is_slanted(self) -> bool {
        !matches!(self, SlantStyle::Normal)
    }

    /// Oblique angle in degrees; italics use the conventional 14 degrees.
    pub fn angle(self) -> i16 {
        match self {
            SlantStyle::Normal => 0,
            SlantStyle::Italic => 14,
            SlantStyle::Oblique(deg) => deg,
        }
    }
}

/// Closed weight interval. A static face has `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightRange {
    pub min: FontWeight,
    pub max: FontWeight,
}

impl WeightRange {
    pub fn single(weight: FontWeight) -> Self {
        Self {
            min: weight,
            max: weight,
        }
    }

    pub fn new(min: FontWeight, max: FontWeight) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[inline]
    pub fn contains(&self, weight: FontWeight) -> bool {
        self.min <= weight && weight <= self.max
    }

    /// Clamps a requested weight into this range.
    #[inline]
    pub fn clamp(&self, weight: FontWeight) -> FontWeight {
        FontWeight(weight.0.clamp(self.min.0, self.max.0))
    }

    /// Absolute distance from the requested weight to this range.
    #[inline]
    pub fn distance(&self, weight: FontWeight) -> u16 {
        self.clamp(weight).0.abs_diff(weight.0)
    }
}

/// Closed stretch interval in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchRange {
    pub min: FontStretch,
    pub max: FontStretch,
}

impl StretchRange {
    pub fn single(stretch: FontStretch) -> Self {
        Self {
            min: stretch,
            max: stretch,
        }
    }

    #[inline]
    pub fn contains(&self, stretch: FontStretch) -> bool {
        self.min.0 <= stretch.0 && stretch.0 <= self.max.0
    }

    #[inline]
    pub fn clamp(&self, stretch: FontStretch) -> FontStretch {
        FontStretch(stretch.0.clamp(self.min.0, self.max.0))
    }

    #[inline]
    pub fn distance(&self, stretch: FontStretch) -> f32 {
        (self.clamp(stretch).0 - stretch.0).abs()
    }
}

/// Closed slant interval. Static faces are a single slant; variable
/// fonts with a `slnt` axis may declare an oblique angle range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlantRange {
    pub min: SlantStyle,
    pub max: SlantStyle,
}

impl SlantRange {
    pub fn single(slant: SlantStyle) -> Self {
        Self {
            min: slant,
            max: slant,
        }
    }

    /// Whether any slant in this range is in the same class as the request
    /// (upright vs slanted).
    #[inline]
    pub fn matches_class(&self, slant: SlantStyle) -> bool {
        self.min.is_slanted() == slant.is_slanted() || self.max.is_slanted() == slant.is_slanted()
    }

    /// Angle distance from the requested slant to this range.
    pub fn angle_distance(&self, slant: SlantStyle) -> i16 {
        let angle = slant.angle();
        let lo = self.min.angle().min(self.max.angle());
        let hi = self.min.angle().max(self.max.angle());
        if angle < lo {
            lo - angle
        } else if angle > hi {
            angle - hi
        } else {
            0
        }
    }
}

/// A requested style, as a layout collaborator would express it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StyleRequest {
    pub weight: FontWeight,
    pub stretch: FontStretch,
    pub slant: SlantStyle,
}

impl StyleRequest {
    pub fn new(weight: FontWeight, stretch: FontStretch, slant: SlantStyle) -> Self {
        Self {
            weight,
            stretch,
            slant,
        }
    }

    pub fn bold() -> Self {
        Self {
            weight: FontWeight::BOLD,
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            slant: SlantStyle::Italic,
            ..Self::default()
        }
    }

    /// Stable signature for cache keys.
    pub(crate) fn signature(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.weight.hash(&mut hasher);
        self.stretch.hash(&mut hasher);
        self.slant.hash(&mut hasher);
        hasher.finish()
    }
}

// The platform weight trait is a float in -1.0..=1.0 with 0.0 meaning
// the regular weight. The exact mapping is not well defined by any
// platform; these anchors are empirically determined from what system
// fonts with a range of weights report.
const WEIGHT_ANCHORS: &[(f32, u16)] = &[
    (-1.0, 1),
    (-0.8, 100),
    (-0.6, 200),
    (-0.4, 300),
    (0.0, 400),
    (0.23, 500),
    (0.3, 600),
    (0.4, 700),
    (0.56, 800),
    // Some platforms report the same trait value for faces that declare
    // usWeightClass 800 and 900; 900 keeps an intermediate slot for the
    // 0.56 reporters above.
    (0.62, 900),
    (1.0, 1000),
];

/// Maps a continuous platform weight trait to a CSS weight.
///
/// Binary-searches the anchor table for the bracketing control points
/// and linearly interpolates; values beyond the extremes clamp.
pub fn weight_from_trait(trait_value: f32) -> FontWeight {
    let first = WEIGHT_ANCHORS[0];
    if trait_value <= first.0 {
        return FontWeight(first.1);
    }
    let last = WEIGHT_ANCHORS[WEIGHT_ANCHORS.len() - 1];
    if trait_value >= last.0 {
        return FontWeight(last.1);
    }

    let idx = WEIGHT_ANCHORS
        .partition_point(|(anchor, _)| *anchor < trait_value);
    let (hi_t, hi_w) = WEIGHT_ANCHORS[idx];
    if hi_t == trait_value {
        return FontWeight(hi_w);
    }
    let (lo_t, lo_w) = WEIGHT_ANCHORS[idx - 1];
    let t = (trait_value - lo_t) / (hi_t - lo_t);
    let weight = (lo_w as f32) * (1.0 - t) + (hi_w as f32) * t;
    FontWeight(weight.round() as u16)
}

/// Maps a continuous platform width trait to a CSS stretch percentage.
///
/// Non-negative trait values scale 100% up to 200% at the extreme;
/// negative values scale 100% down to 50%.
pub fn stretch_from_trait(trait_value: f32) -> FontStretch {
    let clamped = trait_value.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        FontStretch(100.0 + clamped * 100.0)
    } else {
        FontStretch(100.0 + clamped * 50.0)
    }
}

/// Applies an administratively-configured weight override.
///
/// The raw configured value is rounded to the nearest multiple of 100
/// and clamped to 100..=900, replacing any trait-derived weight.
pub fn weight_from_override(raw: i32) -> FontWeight {
    let hundreds = ((raw + 50) / 100).clamp(1, 9);
    FontWeight((hundreds * 100) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_trait_maps_extremes_to_scale_ends() {
        assert_eq!(weight_from_trait(-1.0), FontWeight(1));
        assert_eq!(weight_from_trait(1.0), FontWeight(1000));
        assert_eq!(weight_from_trait(-2.5), FontWeight(1));
        assert_eq!(weight_from_trait(3.0), FontWeight(1000));
    }

    #[test]
    fn weight_trait_maps_anchors_exactly() {
        assert_eq!(weight_from_trait(0.0), FontWeight::NORMAL);
        assert_eq!(weight_from_trait(0.4), FontWeight::BOLD);
        assert_eq!(weight_from_trait(0.62), FontWeight(900));
    }

    #[test]
    fn weight_trait_interpolates_strictly_between_anchors() {
        // Between 0.0 (400) and 0.23 (500).
        let w = weight_from_trait(0.1);
        assert!(w > FontWeight(400) && w < FontWeight(500), "got {w:?}");

        // Between 0.4 (700) and 0.56 (800), midpoint.
        let w = weight_from_trait(0.48);
        assert_eq!(w, FontWeight(750));
    }

    #[test]
    fn weight_trait_is_monotonic() {
        let mut prev = weight_from_trait(-1.0);
        let mut t = -1.0f32;
        while t <= 1.0 {
            let w = weight_from_trait(t);
            assert!(w >= prev, "not monotonic at {t}");
            prev = w;
            t += 0.01;
        }
    }

    #[test]
    fn stretch_trait_is_piecewise_linear() {
        assert_eq!(stretch_from_trait(0.0), FontStretch::NORMAL);
        assert_eq!(stretch_from_trait(1.0), FontStretch::ULTRA_EXPANDED);
        assert_eq!(stretch_from_trait(-1.0), FontStretch::ULTRA_CONDENSED);
        assert_eq!(stretch_from_trait(0.5).percentage(), 150.0);
        assert_eq!(stretch_from_trait(-0.5).percentage(), 75.0);
    }

    #[test]
    fn weight_override_rounds_and_clamps() {
        assert_eq!(weight_from_override(640), FontWeight(600));
        assert_eq!(weight_from_override(650), FontWeight(700));
        assert_eq!(weight_from_override(50), FontWeight(100));
        assert_eq!(weight_from_override(2000), FontWeight(900));
        assert_eq!(weight_from_override(1), FontWeight(100));
    }

    #[test]
    fn weight_range_distance_and_clamp() {
        let range = WeightRange::new(FontWeight(400), FontWeight(700));
        assert!(range.contains(FontWeight(550)));
        assert_eq!(range.distance(FontWeight(550)), 0);
        assert_eq!(range.distance(FontWeight(300)), 100);
        assert_eq!(range.clamp(FontWeight(900)), FontWeight(700));
    }

    #[test]
    fn slant_range_class_and_angle() {
        let italic = SlantRange::single(SlantStyle::Italic);
        assert!(italic.matches_class(SlantStyle::Oblique(10)));
        assert!(!italic.matches_class(SlantStyle::Normal));

        let oblique = SlantRange {
            min: SlantStyle::Oblique(5),
            max: SlantStyle::Oblique(20),
        };
        assert_eq!(oblique.angle_distance(SlantStyle::Oblique(10)), 0);
        assert_eq!(oblique.angle_distance(SlantStyle::Oblique(30)), 10);
    }
}
