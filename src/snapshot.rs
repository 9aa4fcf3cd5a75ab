//! Catalog replication.
//!
//! A catalog built in one process can be exported as a flat list of
//! family records and imported read-only elsewhere. Export finishes
//! any pending lazy work first, so imported entries arrive with style
//! ranges and coverage already resolved; consumers never talk to a
//! font provider at all. The record types are plain serde data, the
//! transport is the embedder's business.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogShared, FontCatalog};
use crate::charmap::CharacterMap;
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::face::FontFace;
use crate::family::{family_key, FontFamily};
use crate::provider::{
    FaceDescriptor, FallbackSuggestion, FontProvider, ProviderHandle, Tag,
};
use crate::style::{SlantRange, StretchRange, StyleRequest, WeightRange};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecord {
    pub postscript_name: String,
    pub style_name: String,
    pub weight: WeightRange,
    pub stretch: StretchRange,
    pub slant: SlantRange,
    pub fixed_pitch: bool,
    /// Whether the face must be shaped by the alternate (AAT) engine.
    pub requires_aat: bool,
    /// Offset of the format-14 variation-selector subtable, if any.
    pub uvs_offset: Option<u32>,
    /// Sparse coverage blocks: (block index, 256 bits as four words).
    pub coverage: Vec<(u32, [u64; 4])>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyRecord {
    pub name: String,
    pub faces: Vec<FaceRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub families: Vec<FamilyRecord>,
}

impl FontCatalog {
    /// Exports every visible family with fully-resolved faces. Forces
    /// any remaining lazy population and coverage builds, so this is
    /// the expensive direction.
    pub fn export_snapshot(&self) -> CatalogSnapshot {
        let mut families: Vec<FamilyRecord> = self
            .families()
            .iter()
            .map(|family| FamilyRecord {
                name: family.name().to_string(),
                faces: family
                    .faces()
                    .iter()
                    .map(|face| FaceRecord {
                        postscript_name: face.postscript_name().to_string(),
                        style_name: face.style_name().to_string(),
                        weight: face.weight(),
                        stretch: face.stretch(),
                        slant: face.slant(),
                        fixed_pitch: face.is_fixed_pitch(),
                        requires_aat: face.requires_alternate_shaping(),
                        uvs_offset: face.uvs_offset(),
                        coverage: face.character_map().to_blocks(),
                    })
                    .collect(),
            })
            .collect();
        families.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!("exported snapshot: {} families", families.len());
        CatalogSnapshot { families }
    }
}

/// Builds a read-only catalog from an exported snapshot.
///
/// The resulting catalog has no working provider behind it: every face
/// answers from its imported ranges and coverage, and operations that
/// would need live enumeration (rebuild, fallback suggestions) fail
/// softly.
pub fn import_snapshot(snapshot: &CatalogSnapshot, config: CatalogConfig) -> Arc<FontCatalog> {
    let shared = Arc::new(CatalogShared::new(
        ProviderHandle::new(Arc::new(DetachedProvider)),
        config,
    ));

    let mut families: FxHashMap<String, Arc<FontFamily>> = FxHashMap::default();
    for record in &snapshot.families {
        let faces = record
            .faces
            .iter()
            .map(|face| {
                let map = CharacterMap::from_blocks(face.coverage.iter().copied());
                Arc::new(FontFace::pre_resolved(
                    shared.clone(),
                    &record.name,
                    face.postscript_name.clone(),
                    face.style_name.clone(),
                    face.weight,
                    face.stretch,
                    face.slant,
                    face.fixed_pitch,
                    shared.interner.intern(map),
                    face.uvs_offset,
                    face.requires_aat,
                ))
            })
            .collect();
        families.insert(
            family_key(&record.name),
            Arc::new(FontFamily::pre_resolved(
                shared.clone(),
                &record.name,
                faces,
            )),
        );
    }
    log::debug!("imported snapshot: {} families", families.len());
    FontCatalog::from_parts(shared, families, FxHashMap::default(), FxHashMap::default())
}

/// Stand-in provider for imported catalogs.
struct DetachedProvider;

impl DetachedProvider {
    fn unavailable() -> CatalogError {
        CatalogError::provider("catalog was imported from a snapshot")
    }
}

impl FontProvider for DetachedProvider {
    fn enumerate_families(&self) -> Result<Vec<String>> {
        Err(Self::unavailable())
    }
    fn enumerate_faces(&self, _family_name: &str) -> Result<Vec<FaceDescriptor>> {
        Err(Self::unavailable())
    }
    fn table(&self, _postscript_name: &str, _table: Tag) -> Result<Option<Vec<u8>>> {
        Err(Self::unavailable())
    }
    fn suggest_fallback_family(
        &self,
        _cp: u32,
        _style: &StyleRequest,
    ) -> Result<Option<FallbackSuggestion>> {
        Err(Self::unavailable())
    }
    fn resolve_local_face(&self, _name: &str) -> Result<Option<FallbackSuggestion>> {
        Err(Self::unavailable())
    }
}
