//! Externally-supplied catalog configuration.
//!
//! Administrative data lives here rather than in code: which families
//! are known-defective, which face names get a weight override, which
//! families to preload alias names for. The struct deserializes from
//! whatever settings store the embedder uses; every field has a
//! default so partial configuration is fine.

use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Point size at which generic UI requests switch from the text face
/// to the display face.
pub const TEXT_DISPLAY_CROSSOVER: f32 = 20.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Per-face weight overrides, keyed by PostScript name. Raw values
    /// are rounded to the nearest 100 and clamped to 100..=900.
    pub weight_overrides: FxHashMap<String, i32>,

    /// Families whose alias names are read eagerly at startup.
    pub preload_names: Vec<String>,

    /// Families known to report spurious coverage for certain Tibetan
    /// and Arabic code points; the filter always clears those points.
    pub aat_blocklist: Vec<String>,

    /// Families whose default underline position clips descenders.
    pub bad_underline_families: Vec<String>,

    /// System UI family used at small sizes.
    pub system_text_family: Option<String>,

    /// System UI family used at large sizes.
    pub system_display_family: Option<String>,

    /// Size boundary between the text and display UI families.
    pub text_display_crossover: f32,

    /// Capacity of the per-catalog fallback result cache.
    pub fallback_cache_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            weight_overrides: FxHashMap::default(),
            preload_names: Vec::new(),
            aat_blocklist: [
                "Songti SC",
                "Songti TC",
                "STSong",
                "Kaiti SC",
                "Kaiti TC",
                "STKaiti",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            bad_underline_families: Vec::new(),
            system_text_family: None,
            system_display_family: None,
            text_display_crossover: TEXT_DISPLAY_CROSSOVER,
            fallback_cache_size: 256,
        }
    }
}

impl CatalogConfig {
    /// Raw weight override for a face, if configured.
    pub fn weight_override(&self, postscript_name: &str) -> Option<i32> {
        self.weight_overrides.get(postscript_name).copied()
    }
}
