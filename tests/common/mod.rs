//! Shared mock provider for the integration tests.
//!
//! Serves hand-built big-endian SFNT tables so coverage parsing and
//! the complex-script filter run against real bytes, and counts every
//! provider call so tests can assert on laziness and caching.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use font_catalog::error::Result;
use font_catalog::provider::{
    FaceDescriptor, FallbackSuggestion, FontProvider, StyleTraits, Tag,
};
use font_catalog::style::{FontStretch, FontWeight, SlantStyle, StyleRequest};

/// A `cmap` with a single format 12 subtable covering the given
/// inclusive ranges.
pub fn cmap_format12(ranges: &[(u32, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_be_bytes()); // version
    out.extend_from_slice(&1u16.to_be_bytes()); // numTables
    out.extend_from_slice(&3u16.to_be_bytes()); // platform: Windows
    out.extend_from_slice(&10u16.to_be_bytes()); // encoding: Unicode full
    out.extend_from_slice(&12u32.to_be_bytes()); // subtable offset

    let length = 16 + 12 * ranges.len() as u32;
    out.extend_from_slice(&12u16.to_be_bytes()); // format
    out.extend_from_slice(&0u16.to_be_bytes()); // reserved
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // language
    out.extend_from_slice(&(ranges.len() as u32).to_be_bytes());
    let mut glyph = 1u32;
    for &(start, end) in ranges {
        out.extend_from_slice(&start.to_be_bytes());
        out.extend_from_slice(&end.to_be_bytes());
        out.extend_from_slice(&glyph.to_be_bytes());
        glyph += end - start + 1;
    }
    out
}

/// A minimal `GSUB`: header plus a ScriptList declaring the given
/// script tags.
pub fn gsub_with_scripts(tags: &[&[u8; 4]]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&10u16.to_be_bytes()); // ScriptList offset
    out.extend_from_slice(&0u16.to_be_bytes()); // FeatureList (unused)
    out.extend_from_slice(&0u16.to_be_bytes()); // LookupList (unused)
    out.extend_from_slice(&(tags.len() as u16).to_be_bytes());
    for (i, t) in tags.iter().enumerate() {
        out.extend_from_slice(*t);
        let offset = 2 + (tags.len() * 6) + i * 4;
        out.extend_from_slice(&(offset as u16).to_be_bytes());
    }
    out
}

/// Marker bytes for tables whose presence is all that matters.
pub fn marker_table() -> Vec<u8> {
    vec![0]
}

pub struct MockFont {
    pub family: String,
    pub descriptor: FaceDescriptor,
    pub tables: FxHashMap<Tag, Vec<u8>>,
}

impl MockFont {
    pub fn new(family: &str, descriptor: FaceDescriptor) -> Self {
        MockFont {
            family: family.to_string(),
            descriptor,
            tables: FxHashMap::default(),
        }
    }

    pub fn with_table(mut self, tag: Tag, data: Vec<u8>) -> Self {
        self.tables.insert(tag, data);
        self
    }
}

pub fn css_descriptor(ps: &str, style_name: &str, weight: u16, slant: SlantStyle) -> FaceDescriptor {
    FaceDescriptor {
        postscript_name: ps.to_string(),
        style_name: style_name.to_string(),
        style: StyleTraits::Css {
            weight: FontWeight::new(weight),
            stretch: FontStretch::NORMAL,
            slant,
        },
        fixed_pitch: false,
    }
}

pub fn continuous_descriptor(ps: &str, style_name: &str, weight: f32) -> FaceDescriptor {
    FaceDescriptor {
        postscript_name: ps.to_string(),
        style_name: style_name.to_string(),
        style: StyleTraits::Continuous {
            weight,
            width: 0.0,
            slant_angle: 0.0,
        },
        fixed_pitch: false,
    }
}

#[derive(Default)]
pub struct CallCounts {
    pub enumerate_families: AtomicU64,
    pub enumerate_faces: AtomicU64,
    pub table: AtomicU64,
    pub fallback: AtomicU64,
}

impl CallCounts {
    pub fn total(&self) -> u64 {
        self.enumerate_families.load(Ordering::Relaxed)
            + self.enumerate_faces.load(Ordering::Relaxed)
            + self.table.load(Ordering::Relaxed)
            + self.fallback.load(Ordering::Relaxed)
    }
}

pub struct MockProvider {
    fonts: Vec<MockFont>,
    /// PostScript name served for fallback queries, if any.
    fallback_face: Option<String>,
    pub calls: Arc<CallCounts>,
}

impl MockProvider {
    pub fn new(fonts: Vec<MockFont>) -> Self {
        MockProvider {
            fonts,
            fallback_face: None,
            calls: Arc::new(CallCounts::default()),
        }
    }

    pub fn with_fallback_face(mut self, postscript_name: &str) -> Self {
        self.fallback_face = Some(postscript_name.to_string());
        self
    }

    fn find(&self, postscript_name: &str) -> Option<&MockFont> {
        self
            .fonts
            .iter()
            .find(|font| font.descriptor.postscript_name.eq_ignore_ascii_case(postscript_name))
    }
}

impl FontProvider for MockProvider {
    fn enumerate_families(&self) -> Result<Vec<String>> {
        self.calls.enumerate_families.fetch_add(1, Ordering::Relaxed);
        let mut names: Vec<String> = Vec::new();
        for font in &self.fonts {
            if !names.contains(&font.family) {
                names.push(font.family.clone());
            }
        }
        Ok(names)
    }

    fn enumerate_faces(&self, family_name: &str) -> Result<Vec<FaceDescriptor>> {
        self.calls.enumerate_faces.fetch_add(1, Ordering::Relaxed);
        Ok(
            self
                .fonts
                .iter()
                .filter(|font| font.family.eq_ignore_ascii_case(family_name))
                .map(|font| font.descriptor.clone())
                .collect(),
        )
    }

    fn table(&self, postscript_name: &str, table: Tag) -> Result<Option<Vec<u8>>> {
        self.calls.table.fetch_add(1, Ordering::Relaxed);
        Ok(
            self
                .find(postscript_name)
                .and_then(|font| font.tables.get(&table))
                .cloned(),
        )
    }

    fn suggest_fallback_family(
        &self,
        _cp: u32,
        _style: &StyleRequest,
    ) -> Result<Option<FallbackSuggestion>> {
        self.calls.fallback.fetch_add(1, Ordering::Relaxed);
        let Some(name) = self.fallback_face.as_deref() else {
            return Ok(None);
        };
        Ok(self.find(name).map(|font| FallbackSuggestion {
            family_name: font.family.clone(),
            face: font.descriptor.clone(),
        }))
    }

    fn resolve_local_face(&self, name: &str) -> Result<Option<FallbackSuggestion>> {
        Ok(self.find(name).map(|font| FallbackSuggestion {
            family_name: font.family.clone(),
            face: font.descriptor.clone(),
        }))
    }
}
