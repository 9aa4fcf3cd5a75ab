//! A single font face and its lazily-built character coverage.
//!
//! Coverage is expensive (a provider round-trip plus cmap parsing and
//! complex-script filtering), so it is built on first use under a
//! double-checked lock and interned through the catalog's shared
//! interner. Faces imported from a snapshot carry pre-resolved
//! coverage and never touch the provider.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::catalog::CatalogShared;
use crate::charmap::{parse_cmap, CharacterMap, CharacterMapBuilder};
use crate::provider::{
    FaceDescriptor, Tag, TAG_CMAP, TAG_GPOS, TAG_GSUB, TAG_KERX, TAG_MORT, TAG_MORX, TAG_SILF,
};
use crate::script_filter::{self, LayoutCapabilities};
use crate::style::{SlantRange, StretchRange, WeightRange};

/// Face names treated as the standard members of a family.
pub const STANDARD_FACE_NAMES: &[&str] = &[
    "Regular",
    "Bold",
    "Italic",
    "Oblique",
    "Bold Italic",
    "Bold Oblique",
];

#[derive(Debug, Clone)]
struct CoverageState {
    map: Arc<CharacterMap>,
    uvs_offset: Option<u32>,
    requires_aat: bool,
}

#[derive(Debug)]
pub struct FontFace {
    shared: Arc<CatalogShared>,
    postscript_name: String,
    style_name: String,
    family_name: String,
    weight: WeightRange,
    stretch: StretchRange,
    slant: SlantRange,
    fixed_pitch: bool,
    standard_face: bool,
    user_font: bool,
    coverage: RwLock<Option<CoverageState>>,
    table_presence: Mutex<FxHashMap<Tag, bool>>,
}

impl FontFace {
    pub fn from_descriptor(
        shared: Arc<CatalogShared>,
        family_name: &str,
        descriptor: &FaceDescriptor,
        user_font: bool,
    ) -> Self {
        let (mut weight, stretch, slant) = descriptor.style.to_css();
        if let Some(raw) = shared.config.weight_override(&descriptor.postscript_name) {
            weight = crate::style::weight_from_override(raw);
        }
        let standard_face = STANDARD_FACE_NAMES
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&descriptor.style_name));
        FontFace {
            shared,
            postscript_name: descriptor.postscript_name.clone(),
            style_name: descriptor.style_name.clone(),
            family_name: family_name.to_string(),
            weight: WeightRange::single(weight),
            stretch: StretchRange::single(stretch),
            slant: SlantRange::single(slant),
            fixed_pitch: descriptor.fixed_pitch,
            standard_face,
            user_font,
            coverage: RwLock::new(None),
            table_presence: Mutex::new(FxHashMap::default()),
        }
    }

    /// Builds a face whose coverage and shaping flags are already known,
    /// for snapshot import. Such faces never consult the provider.
    #[allow(clippy::too_many_arguments)]
    pub fn pre_resolved(
        shared: Arc<CatalogShared>,
        family_name: &str,
        postscript_name: String,
        style_name: String,
        weight: WeightRange,
        stretch: StretchRange,
        slant: SlantRange,
        fixed_pitch: bool,
        map: Arc<CharacterMap>,
        uvs_offset: Option<u32>,
        requires_aat: bool,
    ) -> Self {
        let standard_face = STANDARD_FACE_NAMES
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&style_name));
        FontFace {
            shared,
            postscript_name,
            style_name,
            family_name: family_name.to_string(),
            weight,
            stretch,
            slant,
            fixed_pitch,
            standard_face,
            user_font: false,
            coverage: RwLock::new(Some(CoverageState {
                map,
                uvs_offset,
                requires_aat,
            })),
            table_presence: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    pub fn style_name(&self) -> &str {
        &self.style_name
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn weight(&self) -> WeightRange {
        self.weight
    }

    pub fn stretch(&self) -> StretchRange {
        self.stretch
    }

    pub fn slant(&self) -> SlantRange {
        self.slant
    }

    pub fn is_fixed_pitch(&self) -> bool {
        self.fixed_pitch
    }

    pub fn is_standard_face(&self) -> bool {
        self.standard_face
    }

    pub fn is_user_font(&self) -> bool {
        self.user_font
    }

    /// Whether the face must be shaped by the alternate (AAT) engine.
    /// Forces coverage to be built, since the answer comes from the same
    /// table probe.
    pub fn requires_alternate_shaping(&self) -> bool {
        self.ensure_coverage().1
    }

    /// Offset of the format-14 variation-selector subtable within the
    /// face's cmap, when present.
    pub fn uvs_offset(&self) -> Option<u32> {
        self.ensure_coverage_state().uvs_offset
    }

    /// The face's character coverage, built on first use.
    pub fn character_map(&self) -> Arc<CharacterMap> {
        self.ensure_coverage().0
    }

    /// Coverage if it has already been built; `None` otherwise. Lets
    /// callers probe without triggering provider work.
    pub fn cached_character_map(&self) -> Option<Arc<CharacterMap>> {
        self.coverage.read().as_ref().map(|state| state.map.clone())
    }

    pub fn has_character(&self, cp: u32) -> bool {
        self.character_map().contains(cp)
    }

    /// Memoized table-presence probe.
    pub fn has_table(&self, table: Tag) -> bool {
        if let Some(&present) = self.table_presence.lock().get(&table) {
            return present;
        }
        let present = self
            .shared
            .provider
            .with(|provider| provider.has_table(&self.postscript_name, table));
        self.table_presence.lock().insert(table, present);
        present
    }

    fn ensure_coverage(&self) -> (Arc<CharacterMap>, bool) {
        let state = self.ensure_coverage_state();
        (state.map, state.requires_aat)
    }

    fn ensure_coverage_state(&self) -> CoverageState {
        if let Some(state) = self.coverage.read().as_ref() {
            return state.clone();
        }
        let mut slot = self.coverage.write();
        if let Some(state) = slot.as_ref() {
            return state.clone();
        }
        let state = self.build_coverage();
        *slot = Some(state.clone());
        state
    }

    fn build_coverage(&self) -> CoverageState {
        let (builder, uvs_offset) = match self.read_cmap() {
            Ok(parsed) => parsed,
            Err(err) => {
                self.shared.diagnostics.note_parse_failure();
                log::warn!(
                    "coverage unavailable for '{}': {err}",
                    self.postscript_name
                );
                (CharacterMapBuilder::new(), None)
            }
        };
        let (map, requires_aat) = self.filter_coverage(builder);
        self.shared.diagnostics.note_charmap_built();
        log::debug!(
            "built coverage for '{}': {} code points{}",
            self.postscript_name,
            map.len(),
            if requires_aat { " (alternate shaping)" } else { "" }
        );
        CoverageState {
            map,
            uvs_offset,
            requires_aat,
        }
    }

    fn read_cmap(&self) -> crate::error::Result<(CharacterMapBuilder, Option<u32>)> {
        let data = self
            .shared
            .provider
            .with(|provider| provider.table(&self.postscript_name, TAG_CMAP))?;
        match data {
            Some(bytes) => parse_cmap(&bytes),
            None => Err(crate::error::CatalogError::parse(
                "cmap",
                "table missing from face",
            )),
        }
    }

    /// Whether the face ships its own Graphite shaping rules. Such a
    /// face shapes complex scripts itself, so its declared coverage is
    /// trusted as-is.
    pub fn has_graphite_shaping(&self) -> bool {
        self.has_table(TAG_SILF)
    }

    fn filter_coverage(&self, mut builder: CharacterMapBuilder) -> (Arc<CharacterMap>, bool) {
        let mut requires_aat = false;
        if !self.user_font && !self.has_graphite_shaping() {
            let (caps, gsub) = self.shared.provider.with(|provider| {
                let caps = LayoutCapabilities {
                    has_aat_layout: provider.has_table(&self.postscript_name, TAG_MORX)
                        || provider.has_table(&self.postscript_name, TAG_MORT),
                    has_apple_kerning: provider.has_table(&self.postscript_name, TAG_KERX),
                    has_gsub: provider.has_table(&self.postscript_name, TAG_GSUB),
                    has_gpos: provider.has_table(&self.postscript_name, TAG_GPOS),
                };
                let gsub = if caps.has_gsub {
                    provider
                        .table(&self.postscript_name, TAG_GSUB)
                        .ok()
                        .flatten()
                } else {
                    None
                };
                (caps, gsub)
            });
            let outcome = script_filter::apply(
                &mut builder,
                &caps,
                gsub.as_deref(),
                &self.family_name,
                &self.shared.config.aat_blocklist,
            );
            requires_aat = outcome.requires_alternate_shaping;
            if outcome.cleared_ranges > 0 {
                log::debug!(
                    "filtered {} unsupported complex ranges from '{}'",
                    outcome.cleared_ranges,
                    self.postscript_name
                );
            }
        }
        let map = self.shared.interner.intern(builder.freeze());
        (map, requires_aat)
    }
}
