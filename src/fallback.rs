//! Validated last-resort fallback.
//!
//! When no requested family covers a character, the provider is asked
//! for a system-wide suggestion. Suggestions are advisory: the named
//! family is resolved through the catalog, the nearest face is picked,
//! and its actual coverage is checked before the face is accepted. A
//! suggestion that fails validation counts against the bad-fallback
//! diagnostic and the answer is "no face", never a face that cannot
//! render the character.
//!
//! Results are cached per (character, style) in an LRU keyed against
//! the catalog generation, so a font-set change drops the whole cache.

use std::hash::BuildHasherDefault;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::FxHasher;

use crate::catalog::{is_placeholder_family, FontCatalog};
use crate::face::FontFace;
use crate::family::FontFamily;
use crate::style::StyleRequest;

/// A validated fallback answer: the face to use and the family it was
/// found in.
#[derive(Debug, Clone)]
pub struct FallbackMatch {
    pub family: Arc<FontFamily>,
    pub face: Arc<FontFace>,
}

type CacheKey = (u32, u64);
type Cache = LruCache<CacheKey, Option<FallbackMatch>, BuildHasherDefault<FxHasher>>;

pub struct FallbackResolver {
    catalog: Arc<FontCatalog>,
    cache: Mutex<(u64, Cache)>,
}

impl FallbackResolver {
    pub fn new(catalog: Arc<FontCatalog>) -> Self {
        let capacity = catalog.shared().config.fallback_cache_size.max(1);
        let cache = LruCache::with_hasher(
            NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            BuildHasherDefault::default(),
        );
        FallbackResolver {
            catalog,
            cache: Mutex::new((0, cache)),
        }
    }

    /// Finds a face able to render `cp` when the requested families
    /// cannot. One provider suggestion is tried per query; a negative
    /// answer is cached too.
    pub fn resolve_fallback(&self, cp: u32, request: &StyleRequest) -> Option<FallbackMatch> {
        let key = (cp, request.signature());
        let generation = self.catalog.generation();
        {
            let mut cache = self.cache.lock();
            if cache.0 == generation {
                if let Some(cached) = cache.1.get(&key) {
                    return cached.clone();
                }
            }
        }

        let resolved = self.lookup(cp, request);

        let mut cache = self.cache.lock();
        if cache.0 != generation {
            cache.0 = generation;
            cache.1.clear();
        }
        cache.1.put(key, resolved.clone());
        resolved
    }

    fn lookup(&self, cp: u32, request: &StyleRequest) -> Option<FallbackMatch> {
        let suggestion = match self
            .catalog
            .shared()
            .provider
            .with(|provider| provider.suggest_fallback_family(cp, request))
        {
            Ok(suggestion) => suggestion?,
            Err(err) => {
                log::warn!("fallback lookup for U+{cp:04X} failed: {err}");
                return None;
            }
        };

        // The placeholder family claims coverage for everything; treating
        // it as a real answer would mask genuine gaps. Other hidden
        // families are legitimate here: the system UI fonts are dot-named.
        if is_placeholder_family(&suggestion.family_name) {
            log::debug!(
                "rejecting placeholder fallback '{}' for U+{cp:04X}",
                suggestion.family_name
            );
            return None;
        }

        let Some(family) = self
            .catalog
            .find_family_including_system(&suggestion.family_name)
        else {
            self.catalog.shared().diagnostics.note_bad_fallback();
            log::debug!(
                "fallback family '{}' for U+{cp:04X} not in catalog",
                suggestion.family_name
            );
            return None;
        };

        let face = family.find_style_match(request)?;
        if !face.has_character(cp) {
            self.catalog.shared().diagnostics.note_bad_fallback();
            log::debug!(
                "fallback face '{}' does not cover U+{cp:04X}",
                face.postscript_name()
            );
            return None;
        }
        Some(FallbackMatch { family, face })
    }
}

impl std::fmt::Debug for FallbackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackResolver").finish_non_exhaustive()
    }
}
