//! Font source abstraction.
//!
//! The catalog never talks to a platform font API directly. Everything
//! it needs (family enumeration, per-family face descriptors, raw
//! SFNT tables, last-resort per-character suggestions) goes through the
//! [`FontProvider`] trait, and every call is serialized through a
//! [`ProviderHandle`]. Platform font stacks tend not to be safe for
//! concurrent use, and some callbacks re-enter the catalog, so the
//! handle uses a reentrant lock rather than a plain mutex.

use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::error::Result;
use crate::style::{FontStretch, FontWeight, SlantStyle, StyleRequest};

/// A big-endian four-byte SFNT table or script tag.
pub type Tag = u32;

/// Builds a [`Tag`] from its ASCII spelling.
pub const fn tag(bytes: &[u8; 4]) -> Tag {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub const TAG_CMAP: Tag = tag(b"cmap");
pub const TAG_GSUB: Tag = tag(b"GSUB");
pub const TAG_GPOS: Tag = tag(b"GPOS");
pub const TAG_MORX: Tag = tag(b"morx");
pub const TAG_MORT: Tag = tag(b"mort");
pub const TAG_KERX: Tag = tag(b"kerx");
pub const TAG_SILF: Tag = tag(b"Silf");
pub const TAG_NAME: Tag = tag(b"name");

/// Style values as reported by a provider.
///
/// Some sources report resolved CSS-style values directly; others
/// expose normalized design-axis traits that still need mapping onto
/// the CSS scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleTraits {
    /// Already in CSS terms.
    Css {
        weight: FontWeight,
        stretch: FontStretch,
        slant: SlantStyle,
    },
    /// Normalized traits: weight and width in -1.0..=1.0, plus a slant
    /// angle in degrees (0 for upright).
    Continuous {
        weight: f32,
        width: f32,
        slant_angle: f32,
    },
}

impl StyleTraits {
    /// Resolves to CSS-style values, mapping normalized traits through
    /// the anchor tables.
    pub fn to_css(self) -> (FontWeight, FontStretch, SlantStyle) {
        match self {
            StyleTraits::Css {
                weight,
                stretch,
                slant,
            } => (weight, stretch, slant),
            StyleTraits::Continuous {
                weight,
                width,
                slant_angle,
            } => {
                let slant = if slant_angle == 0.0 {
                    SlantStyle::Normal
                } else {
                    SlantStyle::Oblique(slant_angle.round() as i16)
                };
                (
                    crate::style::weight_from_trait(weight),
                    crate::style::stretch_from_trait(width),
                    slant,
                )
            }
        }
    }
}

/// One face of a family, as enumerated by a provider.
#[derive(Debug, Clone)]
pub struct FaceDescriptor {
    /// PostScript name; the stable key for table access.
    pub postscript_name: String,
    /// Style name within the family ("Regular", "Bold Italic", ...).
    pub style_name: String,
    pub style: StyleTraits,
    /// Whether the face is fixed-pitch.
    pub fixed_pitch: bool,
}

/// An alternate (localized or legacy) name a family answers to. An
/// empty `face_names` list means the alias covers the whole family;
/// otherwise it names just the covered faces, the way legacy full
/// names like "Helvetica Light" refer to one face.
#[derive(Debug, Clone)]
pub struct FamilyAlias {
    pub name: String,
    pub face_names: Vec<String>,
}

/// A last-resort suggestion for a character the requested families
/// cannot cover.
#[derive(Debug, Clone)]
pub struct FallbackSuggestion {
    pub family_name: String,
    pub face: FaceDescriptor,
}

/// Called when the underlying font set changes.
pub type ChangeListener = Box<dyn Fn() + Send + Sync>;

/// Source of font data.
///
/// Implementations must be `Send + Sync`, but callers still route
/// every call through a [`ProviderHandle`]; the trait itself makes no
/// serialization promises.
pub trait FontProvider: Send + Sync {
    /// Canonical names of every available family.
    fn enumerate_families(&self) -> Result<Vec<String>>;

    /// Faces belonging to one family, by canonical name.
    fn enumerate_faces(&self, family_name: &str) -> Result<Vec<FaceDescriptor>>;

    /// Raw bytes of one SFNT table of a face, or `None` when the face
    /// does not carry the table.
    fn table(&self, postscript_name: &str, table: Tag) -> Result<Option<Vec<u8>>>;

    /// Whether a face carries a table, without copying its bytes.
    fn has_table(&self, postscript_name: &str, table: Tag) -> bool {
        matches!(self.table(postscript_name, table), Ok(Some(_)))
    }

    /// Alternate names (localized or legacy) under which a family or a
    /// subset of its faces is also known, if the provider has any.
    fn alias_names(&self, family_name: &str) -> Result<Vec<FamilyAlias>> {
        let _ = family_name;
        Ok(Vec::new())
    }

    /// System-wide last-resort lookup for a single character.
    ///
    /// The suggestion is advisory: callers validate the face's actual
    /// coverage before using it.
    fn suggest_fallback_family(
        &self,
        cp: u32,
        style: &StyleRequest,
    ) -> Result<Option<FallbackSuggestion>>;

    /// Looks up a single face by PostScript or full name, together with
    /// the family it belongs to. Used for dynamically-referenced local
    /// fonts.
    fn resolve_local_face(&self, name: &str) -> Result<Option<FallbackSuggestion>>;

    /// Registers a callback fired when the available font set changes.
    /// Providers without change notification ignore the listener.
    fn register_change_listener(&self, listener: ChangeListener) {
        let _ = listener;
    }
}

/// Serializes access to a [`FontProvider`].
///
/// The lock is reentrant so a provider callback that re-enters the
/// catalog (and thus the provider) does not deadlock.
pub struct ProviderHandle {
    provider: Arc<dyn FontProvider>,
    lock: ReentrantMutex<()>,
}

impl ProviderHandle {
    pub fn new(provider: Arc<dyn FontProvider>) -> Self {
        ProviderHandle {
            provider,
            lock: ReentrantMutex::new(()),
        }
    }

    /// Runs `f` with exclusive provider access.
    pub fn with<T>(&self, f: impl FnOnce(&dyn FontProvider) -> T) -> T {
        let _guard = self.lock.lock();
        f(self.provider.as_ref())
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{FontStretch, FontWeight};

    #[test]
    fn tag_spelling_round_trips() {
        assert_eq!(TAG_GSUB, 0x47535542);
        assert_eq!(tag(b"arab").to_be_bytes(), *b"arab");
    }

    #[test]
    fn continuous_traits_map_through_anchors() {
        let traits = StyleTraits::Continuous {
            weight: 0.4,
            width: 0.0,
            slant_angle: 0.0,
        };
        let (weight, stretch, slant) = traits.to_css();
        assert_eq!(weight, FontWeight::BOLD);
        assert_eq!(stretch, FontStretch::NORMAL);
        assert_eq!(slant, SlantStyle::Normal);
    }

    #[test]
    fn slant_angle_becomes_oblique() {
        let traits = StyleTraits::Continuous {
            weight: 0.0,
            width: 0.0,
            slant_angle: 12.0,
        };
        let (_, _, slant) = traits.to_css();
        assert_eq!(slant, SlantStyle::Oblique(12));
    }

    struct Reentrant;

    impl FontProvider for Reentrant {
        fn enumerate_families(&self) -> Result<Vec<String>> {
            Ok(vec!["Inner".to_string()])
        }
        fn enumerate_faces(&self, _family_name: &str) -> Result<Vec<FaceDescriptor>> {
            Ok(Vec::new())
        }
        fn table(&self, _postscript_name: &str, _table: Tag) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
        fn suggest_fallback_family(
            &self,
            _cp: u32,
            _style: &StyleRequest,
        ) -> Result<Option<FallbackSuggestion>> {
            Ok(None)
        }
        fn resolve_local_face(&self, _name: &str) -> Result<Option<FallbackSuggestion>> {
            Ok(None)
        }
    }

    #[test]
    fn handle_lock_is_reentrant() {
        let handle = ProviderHandle::new(Arc::new(Reentrant));
        let names = handle.with(|_outer| handle.with(|inner| inner.enumerate_families().unwrap()));
        assert_eq!(names, vec!["Inner".to_string()]);
    }
}
