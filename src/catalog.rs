//! The per-process font catalog.
//!
//! Owns the family tables and everything the other modules share: the
//! serialized provider handle, the coverage interner, configuration,
//! and diagnostics counters. All mutable state sits behind one
//! `RwLock` and is replaced wholesale on rebuild, so readers holding
//! `Arc`s never observe a half-updated catalog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::charmap::CharmapInterner;
use crate::config::CatalogConfig;
use crate::error::Result;
use crate::face::FontFace;
use crate::family::{family_key, FontFamily};
use crate::provider::{FontProvider, ProviderHandle};
use crate::style::StyleRequest;

/// Counters for events worth reporting but not worth failing on.
#[derive(Debug, Default)]
pub struct Diagnostics {
    bad_fallbacks: AtomicU64,
    charmaps_built: AtomicU64,
    parse_failures: AtomicU64,
    rebuilds: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub bad_fallbacks: u64,
    pub charmaps_built: u64,
    pub parse_failures: u64,
    pub rebuilds: u64,
}

impl Diagnostics {
    pub fn note_bad_fallback(&self) {
        self.bad_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_charmap_built(&self) {
        self.charmaps_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            bad_fallbacks: self.bad_fallbacks.load(Ordering::Relaxed),
            charmaps_built: self.charmaps_built.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
        }
    }
}

/// State shared by the catalog and every face and family it creates.
#[derive(Debug)]
pub struct CatalogShared {
    pub provider: ProviderHandle,
    pub interner: CharmapInterner,
    pub config: CatalogConfig,
    pub diagnostics: Diagnostics,
}

impl CatalogShared {
    pub fn new(provider: ProviderHandle, config: CatalogConfig) -> Self {
        CatalogShared {
            provider,
            interner: CharmapInterner::new(),
            config,
            diagnostics: Diagnostics::default(),
        }
    }
}

/// An alternate (localized or legacy) name for a family. An empty
/// `face_names` list means the alias covers the whole family;
/// otherwise lookup through the alias sees only the named faces.
#[derive(Debug, Clone)]
pub struct AliasRecord {
    pub canonical_key: String,
    pub face_names: Vec<String>,
}

#[derive(Debug, Default)]
struct CatalogState {
    families: FxHashMap<String, Arc<FontFamily>>,
    system_families: FxHashMap<String, Arc<FontFamily>>,
    aliases: FxHashMap<String, AliasRecord>,
}

/// Families excluded from ordinary lookup: platform-internal names and
/// the placeholder family that claims coverage for everything.
pub fn is_hidden_family(name: &str) -> bool {
    name.starts_with('.') || name.eq_ignore_ascii_case("LastResort")
}

/// The placeholder family only. Fallback suggestions routinely name
/// hidden platform families (the system UI fonts live there), so
/// fallback must reject no more than this.
pub fn is_placeholder_family(name: &str) -> bool {
    name.eq_ignore_ascii_case("LastResort") || name.eq_ignore_ascii_case(".LastResort")
}

type FontsChangedListener = Box<dyn Fn() + Send + Sync>;

pub struct FontCatalog {
    shared: Arc<CatalogShared>,
    state: RwLock<CatalogState>,
    generation: AtomicU64,
    listeners: Mutex<Vec<FontsChangedListener>>,
}

impl FontCatalog {
    /// Builds a catalog over a provider and performs the initial family
    /// enumeration. The provider's change notification (if any) is wired
    /// to trigger a rebuild.
    pub fn new(provider: Arc<dyn FontProvider>, config: CatalogConfig) -> Result<Arc<Self>> {
        let shared = Arc::new(CatalogShared::new(ProviderHandle::new(provider), config));
        let catalog = Arc::new(FontCatalog {
            shared,
            state: RwLock::new(CatalogState::default()),
            generation: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        });
        catalog.rebuild()?;

        let weak: Weak<FontCatalog> = Arc::downgrade(&catalog);
        catalog.shared.provider.with(|provider| {
            provider.register_change_listener(Box::new(move || {
                if let Some(catalog) = weak.upgrade() {
                    if let Err(err) = catalog.rebuild() {
                        log::warn!("catalog rebuild after font change failed: {err}");
                    }
                }
            }));
        });
        Ok(catalog)
    }

    /// Builds a catalog around pre-resolved state, for snapshot import.
    pub(crate) fn from_parts(
        shared: Arc<CatalogShared>,
        families: FxHashMap<String, Arc<FontFamily>>,
        system_families: FxHashMap<String, Arc<FontFamily>>,
        aliases: FxHashMap<String, AliasRecord>,
    ) -> Arc<Self> {
        Arc::new(FontCatalog {
            shared,
            state: RwLock::new(CatalogState {
                families,
                system_families,
                aliases,
            }),
            generation: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn shared(&self) -> &Arc<CatalogShared> {
        &self.shared
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.shared.diagnostics.snapshot()
    }

    /// Monotonic counter bumped on every rebuild. Caches keyed on
    /// catalog contents compare this to detect staleness.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Registers a callback fired after every completed rebuild.
    pub fn register_fonts_changed(&self, listener: FontsChangedListener) {
        self.listeners.lock().push(listener);
    }

    /// Re-enumerates the available families and swaps the catalog state
    /// in one step. In-flight readers keep whatever `Arc`s they already
    /// cloned out.
    pub fn rebuild(&self) -> Result<()> {
        let names = self
            .shared
            .provider
            .with(|provider| provider.enumerate_families())?;

        let mut families = FxHashMap::default();
        for name in &names {
            if is_hidden_family(name) {
                continue;
            }
            families.insert(
                family_key(name),
                Arc::new(FontFamily::new(self.shared.clone(), name)),
            );
        }

        // System UI families are looked up directly by their (often
        // hidden) platform names, so they live in their own table.
        let mut system_families = FxHashMap::default();
        for name in [
            self.shared.config.system_text_family.as_deref(),
            self.shared.config.system_display_family.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            system_families
                .entry(family_key(name))
                .or_insert_with(|| Arc::new(FontFamily::new(self.shared.clone(), name)));
        }

        let mut aliases = FxHashMap::default();
        for preload in &self.shared.config.preload_names {
            let Some(family) = families.get(&family_key(preload)) else {
                continue;
            };
            let alternates = self
                .shared
                .provider
                .with(|provider| provider.alias_names(family.name()));
            match alternates {
                Ok(alternates) => {
                    for alias in alternates {
                        aliases.insert(
                            family_key(&alias.name),
                            AliasRecord {
                                canonical_key: family.key().to_string(),
                                face_names: alias.face_names,
                            },
                        );
                    }
                }
                Err(err) => {
                    log::warn!("failed to read alias names for '{}': {err}", family.name());
                }
            }
        }

        let family_count = families.len();
        *self.state.write() = CatalogState {
            families,
            system_families,
            aliases,
        };
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.shared.diagnostics.note_rebuild();
        log::debug!("catalog rebuilt: {family_count} visible families");

        for listener in self.listeners.lock().iter() {
            listener();
        }
        Ok(())
    }

    /// Looks up a family by name or alias, case-insensitively. Hidden
    /// families are not found here. A legacy alias that names a face
    /// subset resolves to a view of just those faces.
    pub fn find_family(&self, name: &str) -> Option<Arc<FontFamily>> {
        let key = family_key(name);
        let (canonical, alias_faces) = {
            let state = self.state.read();
            if let Some(family) = state.families.get(&key) {
                return Some(family.clone());
            }
            let alias = state.aliases.get(&key)?;
            let canonical = state.families.get(&alias.canonical_key).cloned()?;
            (canonical, alias.face_names.clone())
        };
        if alias_faces.is_empty() {
            return Some(canonical);
        }
        let faces: Vec<Arc<FontFace>> = alias_faces
            .iter()
            .filter_map(|face_name| canonical.find_face_by_name(face_name))
            .collect();
        if faces.is_empty() {
            return None;
        }
        Some(Arc::new(FontFamily::pre_resolved(
            self.shared.clone(),
            canonical.name(),
            faces,
        )))
    }

    /// Family lookup that also searches the system UI table. Fallback
    /// suggestions may name hidden platform families.
    pub(crate) fn find_family_including_system(&self, name: &str) -> Option<Arc<FontFamily>> {
        if let Some(family) = self.find_family(name) {
            return Some(family);
        }
        let state = self.state.read();
        state.system_families.get(&family_key(name)).cloned()
    }

    /// Names of all visible families, in no particular order.
    pub fn family_names(&self) -> Vec<String> {
        self
            .state
            .read()
            .families
            .values()
            .map(|family| family.name().to_string())
            .collect()
    }

    /// Best face in a named family for a style request.
    pub fn resolve_style(&self, family_name: &str, request: &StyleRequest) -> Option<Arc<FontFace>> {
        self
            .find_family(family_name)?
            .find_style_match(request)
    }

    /// Resolves a generic keyword to a concrete family. The system UI
    /// pseudo-family switches between the text and display optical
    /// families on the requested size; anything else is treated as a
    /// concrete family name. The language tag does not influence the
    /// system UI rule.
    pub fn find_family_for_generic(
        &self,
        generic: &str,
        size: f32,
        _language: Option<&str>,
    ) -> Option<Arc<FontFamily>> {
        if generic.eq_ignore_ascii_case("system-ui") {
            return self.system_family_for_size(size);
        }
        self.find_family(generic)
    }

    /// The system UI family appropriate for a point size: the display
    /// face at or above the crossover, the text face below it.
    pub fn system_family_for_size(&self, size: f32) -> Option<Arc<FontFamily>> {
        let config = &self.shared.config;
        let preferred = if size >= config.text_display_crossover {
            config.system_display_family.as_deref()
        } else {
            config.system_text_family.as_deref()
        };
        let name = preferred
            .or(config.system_text_family.as_deref())
            .or(config.system_display_family.as_deref())?;
        self
            .state
            .read()
            .system_families
            .get(&family_key(name))
            .cloned()
    }

    /// Style resolution against the system UI family for a point size.
    pub fn resolve_system_style(&self, size: f32, request: &StyleRequest) -> Option<Arc<FontFace>> {
        self
            .system_family_for_size(size)?
            .find_style_match(request)
    }

    /// Looks up one concrete face by PostScript or full name, for
    /// dynamically-referenced local fonts. The face is created as a user
    /// font (trusted coverage, no script filtering), provided its family
    /// is visible.
    pub fn resolve_local_face(&self, name: &str) -> Option<Arc<FontFace>> {
        let resolved = self
            .shared
            .provider
            .with(|provider| provider.resolve_local_face(name));
        let suggestion = match resolved {
            Ok(suggestion) => suggestion?,
            Err(err) => {
                log::warn!("local face lookup for '{name}' failed: {err}");
                return None;
            }
        };
        if is_hidden_family(&suggestion.family_name) {
            return None;
        }
        Some(Arc::new(FontFace::from_descriptor(
            self.shared.clone(),
            &suggestion.family_name,
            &suggestion.face,
            true,
        )))
    }

    /// Populates every family's faces and coverage on the worker pool.
    /// Lookups that arrive meanwhile simply do the work first on their
    /// own thread.
    pub fn populate_in_background(self: &Arc<Self>) {
        let catalog = Arc::clone(self);
        rayon::spawn(move || {
            let families: Vec<Arc<FontFamily>> =
                catalog.state.read().families.values().cloned().collect();
            families.par_iter().for_each(|family| {
                for face in family.faces() {
                    let _ = face.character_map();
                }
            });
            log::debug!("background population finished: {} families", families.len());
        });
    }

    /// All visible families, for snapshot export.
    pub(crate) fn families(&self) -> Vec<Arc<FontFamily>> {
        self.state.read().families.values().cloned().collect()
    }
}

impl std::fmt::Debug for FontCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontCatalog")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as CatalogResult;
    use crate::provider::{
        FaceDescriptor, FallbackSuggestion, FamilyAlias, StyleTraits, Tag,
    };
    use crate::style::{FontStretch, FontWeight, SlantStyle};

    struct NamesOnly {
        names: Vec<&'static str>,
    }

    impl NamesOnly {
        fn descriptor(family: &str) -> FaceDescriptor {
            Self::styled(family, "Regular", FontWeight::NORMAL)
        }

        fn styled(family: &str, style_name: &str, weight: FontWeight) -> FaceDescriptor {
            FaceDescriptor {
                postscript_name: format!("{}-{}", family.replace(' ', ""), style_name),
                style_name: style_name.to_string(),
                style: StyleTraits::Css {
                    weight,
                    stretch: FontStretch::NORMAL,
                    slant: SlantStyle::Normal,
                },
                fixed_pitch: false,
            }
        }
    }

    impl FontProvider for NamesOnly {
        fn enumerate_families(&self) -> CatalogResult<Vec<String>> {
            Ok(self.names.iter().map(|n| n.to_string()).collect())
        }
        fn enumerate_faces(&self, family_name: &str) -> CatalogResult<Vec<FaceDescriptor>> {
            if family_name == "Helvetica" {
                Ok(vec![
                    Self::descriptor(family_name),
                    Self::styled(family_name, "Light", FontWeight(300)),
                ])
            } else {
                Ok(vec![Self::descriptor(family_name)])
            }
        }
        fn table(&self, _postscript_name: &str, _table: Tag) -> CatalogResult<Option<Vec<u8>>> {
            Ok(None)
        }
        fn alias_names(&self, family_name: &str) -> CatalogResult<Vec<FamilyAlias>> {
            if family_name == "Helvetica" {
                Ok(vec![
                    FamilyAlias {
                        name: "Helvetique".to_string(),
                        face_names: Vec::new(),
                    },
                    FamilyAlias {
                        name: "Helvetica Light".to_string(),
                        face_names: vec!["Helvetica-Light".to_string()],
                    },
                ])
            } else {
                Ok(Vec::new())
            }
        }
        fn suggest_fallback_family(
            &self,
            _cp: u32,
            _style: &StyleRequest,
        ) -> CatalogResult<Option<FallbackSuggestion>> {
            Ok(None)
        }
        fn resolve_local_face(&self, name: &str) -> CatalogResult<Option<FallbackSuggestion>> {
            if name == "Hidden-Regular" {
                Ok(Some(FallbackSuggestion {
                    family_name: ".Hidden".to_string(),
                    face: Self::descriptor(".Hidden"),
                }))
            } else if name == "Helvetica-Regular" {
                Ok(Some(FallbackSuggestion {
                    family_name: "Helvetica".to_string(),
                    face: Self::descriptor("Helvetica"),
                }))
            } else {
                Ok(None)
            }
        }
    }

    fn catalog() -> Arc<FontCatalog> {
        let provider = Arc::new(NamesOnly {
            names: vec!["Helvetica", "Courier", ".HiddenSans", "LastResort"],
        });
        let mut config = CatalogConfig::default();
        config.preload_names = vec!["Helvetica".to_string()];
        config.system_text_family = Some(".UIText".to_string());
        config.system_display_family = Some(".UIDisplay".to_string());
        FontCatalog::new(provider, config).unwrap()
    }

    #[test]
    fn hidden_families_are_excluded_from_lookup() {
        let catalog = catalog();
        assert!(catalog.find_family("Helvetica").is_some());
        assert!(catalog.find_family(".HiddenSans").is_none());
        assert!(catalog.find_family("LastResort").is_none());
        assert_eq!(catalog.family_names().len(), 2);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = catalog();
        assert!(catalog.find_family("hElVeTiCa").is_some());
    }

    #[test]
    fn preloaded_alias_resolves_to_canonical_family() {
        let catalog = catalog();
        let family = catalog.find_family("helvetique").unwrap();
        assert_eq!(family.name(), "Helvetica");
        assert_eq!(family.faces().len(), 2);
    }

    #[test]
    fn legacy_alias_covers_only_its_named_faces() {
        let catalog = catalog();
        let family = catalog.find_family("helvetica light").unwrap();
        let faces = family.faces();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].postscript_name(), "Helvetica-Light");

        // Any style request through the alias lands on the covered face.
        let face = family.find_style_match(&StyleRequest::bold()).unwrap();
        assert_eq!(face.postscript_name(), "Helvetica-Light");
    }

    #[test]
    fn rebuild_bumps_the_generation_and_fires_listeners() {
        let catalog = catalog();
        let before = catalog.generation();
        let fired = Arc::new(AtomicU64::new(0));
        let observed = fired.clone();
        catalog.register_fonts_changed(Box::new(move || {
            observed.fetch_add(1, Ordering::Relaxed);
        }));
        catalog.rebuild().unwrap();
        assert_eq!(catalog.generation(), before + 1);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(catalog.diagnostics().rebuilds, 2);
    }

    #[test]
    fn system_family_switches_at_the_crossover() {
        let catalog = catalog();
        assert_eq!(
            catalog.system_family_for_size(12.0).unwrap().name(),
            ".UIText"
        );
        assert_eq!(
            catalog
                .find_family_for_generic("system-ui", 12.0, None)
                .unwrap()
                .name(),
            ".UIText"
        );
        assert_eq!(
            catalog
                .find_family_for_generic("system-ui", 12.0, Some("zh-Hans"))
                .unwrap()
                .name(),
            ".UIText"
        );
        assert_eq!(
            catalog.system_family_for_size(20.0).unwrap().name(),
            ".UIDisplay"
        );
        assert_eq!(
            catalog.system_family_for_size(64.0).unwrap().name(),
            ".UIDisplay"
        );
    }

    #[test]
    fn local_face_from_hidden_family_is_refused() {
        let catalog = catalog();
        assert!(catalog.resolve_local_face("Hidden-Regular").is_none());
        let face = catalog.resolve_local_face("Helvetica-Regular").unwrap();
        assert!(face.is_user_font());
    }

    #[test]
    fn resolve_style_finds_the_only_face() {
        let catalog = catalog();
        let face = catalog
            .resolve_style("Courier", &StyleRequest::default())
            .unwrap();
        assert_eq!(face.postscript_name(), "Courier-Regular");
    }
}
