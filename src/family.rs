//! Font families: lazily-populated face lists and style matching.
//!
//! A family starts as a name and fills in its member faces on first
//! use. Population pins the "Regular" face first and orders the rest
//! by weight then stretch, so equal-distance style matches resolve to
//! the most conventional face. Matching picks the same slant class
//! first, then the nearest weight with the 400 pivot, then the nearest
//! stretch.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::CatalogShared;
use crate::face::FontFace;
use crate::provider::FaceDescriptor;
use crate::style::{FontWeight, StyleRequest};

/// Case-folded lookup key for a family or alias name.
pub fn family_key(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug)]
pub struct FontFamily {
    shared: Arc<CatalogShared>,
    key: String,
    name: String,
    bad_underline: bool,
    faces: RwLock<Option<Vec<Arc<FontFace>>>>,
}

impl FontFamily {
    pub fn new(shared: Arc<CatalogShared>, name: &str) -> Self {
        let bad_underline = shared
            .config
            .bad_underline_families
            .iter()
            .any(|family| family.eq_ignore_ascii_case(name));
        FontFamily {
            shared,
            key: family_key(name),
            name: name.to_string(),
            bad_underline,
            faces: RwLock::new(None),
        }
    }

    /// Builds a family whose faces are already resolved, for snapshot
    /// import.
    pub fn pre_resolved(shared: Arc<CatalogShared>, name: &str, faces: Vec<Arc<FontFace>>) -> Self {
        let bad_underline = shared
            .config
            .bad_underline_families
            .iter()
            .any(|family| family.eq_ignore_ascii_case(name));
        FontFamily {
            shared,
            key: family_key(name),
            name: name.to_string(),
            bad_underline,
            faces: RwLock::new(Some(faces)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_bad_underline(&self) -> bool {
        self.bad_underline
    }

    pub fn is_populated(&self) -> bool {
        self.faces.read().is_some()
    }

    /// The family's faces, enumerating them on first use.
    pub fn faces(&self) -> Vec<Arc<FontFace>> {
        if let Some(faces) = self.faces.read().as_ref() {
            return faces.clone();
        }
        let mut slot = self.faces.write();
        if let Some(faces) = slot.as_ref() {
            return faces.clone();
        }
        let faces = self.populate();
        *slot = Some(faces.clone());
        faces
    }

    fn populate(&self) -> Vec<Arc<FontFace>> {
        let descriptors = self
            .shared
            .provider
            .with(|provider| provider.enumerate_faces(&self.name));
        let descriptors = match descriptors {
            Ok(descriptors) => descriptors,
            Err(err) => {
                log::warn!("failed to enumerate faces of '{}': {err}", self.name);
                return Vec::new();
            }
        };

        let mut faces: Vec<Arc<FontFace>> = Vec::with_capacity(descriptors.len());
        let mut prev: Option<&FaceDescriptor> = None;
        for descriptor in &descriptors {
            // Providers sometimes report the same face twice in a row.
            if let Some(prev) = prev {
                if prev.postscript_name == descriptor.postscript_name && prev.style == descriptor.style {
                    continue;
                }
            }
            prev = Some(descriptor);
            faces.push(Arc::new(FontFace::from_descriptor(
                self.shared.clone(),
                &self.name,
                descriptor,
                false,
            )));
        }

        faces.sort_by(|a, b| {
            (a.weight().min, a.stretch().min.0.to_bits())
                .cmp(&(b.weight().min, b.stretch().min.0.to_bits()))
        });
        if let Some(pos) = faces
            .iter()
            .position(|face| face.style_name().eq_ignore_ascii_case("Regular"))
        {
            let regular = faces.remove(pos);
            faces.insert(0, regular);
        }
        log::debug!("populated family '{}' with {} faces", self.name, faces.len());
        faces
    }

    /// Finds the nearest face to a style request: slant class first,
    /// then nearest weight (ties above 400 prefer heavier, at or below
    /// prefer lighter), then nearest stretch. Remaining ties resolve to
    /// the earliest face in family order, which is where "Regular" sits.
    pub fn find_style_match(&self, request: &StyleRequest) -> Option<Arc<FontFace>> {
        let faces = self.faces();
        faces
            .iter()
            .min_by_key(|face| {
                let slant_class = u32::from(!face.slant().matches_class(request.slant));
                let weight_d = weight_key(face, request.weight);
                let stretch_d = face.stretch().distance(request.stretch).to_bits();
                let angle_d = face.slant().angle_distance(request.slant).unsigned_abs();
                (slant_class, weight_d, stretch_d, angle_d)
            })
            .cloned()
    }

    /// Whether any face in the family covers the code point. Populated
    /// coverage only; never triggers provider work on unbuilt faces.
    pub fn cached_coverage_contains(&self, cp: u32) -> bool {
        match self.faces.read().as_ref() {
            Some(faces) => faces.iter().any(|face| {
                face
                    .cached_character_map()
                    .is_some_and(|map| map.contains(cp))
            }),
            None => false,
        }
    }

    /// Looks up one face by PostScript name or by "Family Style" full
    /// name, case-insensitively.
    pub fn find_face_by_name(&self, name: &str) -> Option<Arc<FontFace>> {
        let faces = self.faces();
        faces
            .iter()
            .find(|face| {
                if face.postscript_name().eq_ignore_ascii_case(name) {
                    return true;
                }
                let full = format!("{} {}", self.name, face.style_name());
                full.eq_ignore_ascii_case(name)
            })
            .cloned()
    }
}

/// Weight distance with the 400-pivot tie-break: at equal distance,
/// requests above 400 prefer the heavier face and requests at or below
/// 400 prefer the lighter one.
fn weight_key(face: &FontFace, requested: FontWeight) -> u32 {
    let range = face.weight();
    if range.contains(requested) {
        return 0;
    }
    let distance = range.distance(requested) as u32;
    let face_weight = range.clamp(requested);
    let preferred_side = if requested > FontWeight::NORMAL {
        face_weight > requested
    } else {
        face_weight < requested
    };
    distance * 2 + u32::from(!preferred_side)
}
