//! System font discovery via `fontdb`.
//!
//! The one concrete [`FontProvider`] shipped with the crate. The
//! database is loaded once at construction and indexed by family key
//! and PostScript name; all table access goes through `fontdb`'s
//! borrowed face data and `ttf_parser::RawFace`, so nothing is copied
//! until a table is actually requested.

use rustc_hash::FxHashMap;

use crate::error::{CatalogError, Result};
use crate::provider::{
    FaceDescriptor, FallbackSuggestion, FamilyAlias, FontProvider, StyleTraits, Tag,
};
use crate::style::{FontStretch, FontWeight, SlantStyle, StyleRequest};

pub struct SystemFontProvider {
    db: fontdb::Database,
    /// family key -> face IDs, in database order.
    by_family: FxHashMap<String, Vec<fontdb::ID>>,
    /// family key -> canonical spelling.
    canonical: FxHashMap<String, String>,
    /// lowercased PostScript name -> face ID.
    by_postscript: FxHashMap<String, fontdb::ID>,
}

impl SystemFontProvider {
    /// Loads the platform font set.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        Self::from_database(db)
    }

    /// Wraps an already-populated database. Useful for tests and for
    /// embedders that load fonts from their own directories.
    pub fn from_database(db: fontdb::Database) -> Self {
        let mut by_family: FxHashMap<String, Vec<fontdb::ID>> = FxHashMap::default();
        let mut canonical = FxHashMap::default();
        let mut by_postscript = FxHashMap::default();
        for face in db.faces() {
            let Some((family, _)) = face.families.first() else {
                continue;
            };
            let key = crate::family::family_key(family);
            by_family.entry(key.clone()).or_default().push(face.id);
            canonical.entry(key).or_insert_with(|| family.clone());
            by_postscript.insert(face.post_script_name.to_lowercase(), face.id);
        }
        log::debug!(
            "system font database loaded: {} faces, {} families",
            db.len(),
            by_family.len()
        );
        SystemFontProvider {
            db,
            by_family,
            canonical,
            by_postscript,
        }
    }

    fn descriptor(info: &fontdb::FaceInfo) -> FaceDescriptor {
        let weight = FontWeight::new(info.weight.0);
        let slant = match info.style {
            fontdb::Style::Normal => SlantStyle::Normal,
            fontdb::Style::Italic => SlantStyle::Italic,
            fontdb::Style::Oblique => SlantStyle::Oblique(14),
        };
        FaceDescriptor {
            postscript_name: info.post_script_name.clone(),
            style_name: style_name_for(weight, slant),
            style: StyleTraits::Css {
                weight,
                stretch: stretch_percentage(info.stretch),
                slant,
            },
            fixed_pitch: info.monospaced,
        }
    }

    fn suggestion_for(&self, info: &fontdb::FaceInfo) -> Option<FallbackSuggestion> {
        let (family, _) = info.families.first()?;
        Some(FallbackSuggestion {
            family_name: family.clone(),
            face: Self::descriptor(info),
        })
    }
}

impl Default for SystemFontProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FontProvider for SystemFontProvider {
    fn enumerate_families(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.canonical.values().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn enumerate_faces(&self, family_name: &str) -> Result<Vec<FaceDescriptor>> {
        let key = crate::family::family_key(family_name);
        let Some(ids) = self.by_family.get(&key) else {
            return Ok(Vec::new());
        };
        Ok(
            ids
                .iter()
                .filter_map(|id| self.db.face(*id))
                .map(Self::descriptor)
                .collect(),
        )
    }

    fn table(&self, postscript_name: &str, table: Tag) -> Result<Option<Vec<u8>>> {
        let Some(&id) = self.by_postscript.get(&postscript_name.to_lowercase()) else {
            return Ok(None);
        };
        self
            .db
            .with_face_data(id, |data, index| {
                let raw = ttf_parser::RawFace::parse(data, index)
                    .map_err(|e| CatalogError::parse("sfnt", e.to_string()))?;
                Ok(raw.table(ttf_parser::Tag(table)).map(|t| t.to_vec()))
            })
            .unwrap_or(Ok(None))
    }

    fn alias_names(&self, family_name: &str) -> Result<Vec<FamilyAlias>> {
        let key = crate::family::family_key(family_name);
        let Some(ids) = self.by_family.get(&key) else {
            return Ok(Vec::new());
        };
        // Alias spelling -> PostScript names of the faces that carry it.
        // The first name-table entry is the canonical family name; the
        // rest are localized or legacy spellings, and a legacy spelling
        // carried by only some faces covers just those faces.
        let mut carriers: Vec<(String, Vec<String>)> = Vec::new();
        for id in ids {
            let Some(info) = self.db.face(*id) else {
                continue;
            };
            for (name, _) in info.families.iter().skip(1) {
                if name.eq_ignore_ascii_case(family_name) {
                    continue;
                }
                match carriers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                    Some((_, faces)) => faces.push(info.post_script_name.clone()),
                    None => carriers.push((name.clone(), vec![info.post_script_name.clone()])),
                }
            }
        }
        let family_size = ids.len();
        Ok(
            carriers
                .into_iter()
                .map(|(name, faces)| FamilyAlias {
                    face_names: if faces.len() == family_size {
                        Vec::new()
                    } else {
                        faces
                    },
                    name,
                })
                .collect(),
        )
    }

    /// Linear scan over every installed face. Callers cache the answer
    /// per (character, style), so the cost is paid once per novel gap.
    fn suggest_fallback_family(
        &self,
        cp: u32,
        _style: &StyleRequest,
    ) -> Result<Option<FallbackSuggestion>> {
        let Some(ch) = char::from_u32(cp) else {
            return Ok(None);
        };
        for info in self.db.faces() {
            let Some((family, _)) = info.families.first() else {
                continue;
            };
            if crate::catalog::is_hidden_family(family) {
                continue;
            }
            let covered = self
                .db
                .with_face_data(info.id, |data, index| {
                    ttf_parser::Face::parse(data, index)
                        .map(|face| face.glyph_index(ch).is_some())
                        .unwrap_or(false)
                })
                .unwrap_or(false);
            if covered {
                return Ok(self.suggestion_for(info));
            }
        }
        Ok(None)
    }

    fn resolve_local_face(&self, name: &str) -> Result<Option<FallbackSuggestion>> {
        if let Some(&id) = self.by_postscript.get(&name.to_lowercase()) {
            return Ok(self.db.face(id).and_then(|info| self.suggestion_for(info)));
        }
        // Fall back to "Family Style" full names.
        for info in self.db.faces() {
            let Some((family, _)) = info.families.first() else {
                continue;
            };
            let descriptor = Self::descriptor(info);
            let full = format!("{} {}", family, descriptor.style_name);
            if full.eq_ignore_ascii_case(name) {
                return Ok(Some(FallbackSuggestion {
                    family_name: family.clone(),
                    face: descriptor,
                }));
            }
        }
        Ok(None)
    }
}

fn stretch_percentage(stretch: fontdb::Stretch) -> FontStretch {
    FontStretch(match stretch {
        fontdb::Stretch::UltraCondensed => 50.0,
        fontdb::Stretch::ExtraCondensed => 62.5,
        fontdb::Stretch::Condensed => 75.0,
        fontdb::Stretch::SemiCondensed => 87.5,
        fontdb::Stretch::Normal => 100.0,
        fontdb::Stretch::SemiExpanded => 112.5,
        fontdb::Stretch::Expanded => 125.0,
        fontdb::Stretch::ExtraExpanded => 150.0,
        fontdb::Stretch::UltraExpanded => 200.0,
    })
}

/// Conventional style name from resolved weight and slant; `fontdb`
/// does not surface the face's own subfamily string.
fn style_name_for(weight: FontWeight, slant: SlantStyle) -> String {
    let weight_part = match weight.value() {
        100 => Some("Thin"),
        200 => Some("Extra Light"),
        300 => Some("Light"),
        400 => None,
        500 => Some("Medium"),
        600 => Some("Semi Bold"),
        700 => Some("Bold"),
        800 => Some("Extra Bold"),
        900 => Some("Black"),
        _ => None,
    };
    let slant_part = match slant {
        SlantStyle::Normal => None,
        SlantStyle::Italic => Some("Italic"),
        SlantStyle::Oblique(_) => Some("Oblique"),
    };
    match (weight_part, slant_part) {
        (None, None) => "Regular".to_string(),
        (Some(w), None) => w.to_string(),
        (None, Some(s)) => s.to_string(),
        (Some(w), Some(s)) => format!("{w} {s}"),
    }
}
