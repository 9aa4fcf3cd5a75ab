//! Character coverage maps.
//!
//! A `CharacterMap` is an immutable, block-sparse bitset over the
//! Unicode code space (0..=0x10FFFF) answering "can this face render
//! this code point". Maps are built once per face from the raw `cmap`
//! table, optionally trimmed by the complex-script filter, then frozen
//! and interned by content hash so faces sharing an identical table
//! share one allocation.
//!
//! Parsing fails closed: malformed table data yields an empty map, so a
//! broken font only ever affects fallback, never correctness.

use crate::error::{CatalogError, Result};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Code points per block: 4 x u64 words.
const BLOCK_BITS: u32 = 256;
const MAX_CODEPOINT: u32 = 0x10FFFF;

type Block = [u64; 4];

#[inline]
fn split(cp: u32) -> (u32, usize, u64) {
    let block = cp / BLOCK_BITS;
    let bit = cp % BLOCK_BITS;
    (block, (bit / 64) as usize, 1u64 << (bit % 64))
}

/// Mutable coverage set used during construction and filtering.
#[derive(Debug, Clone, Default)]
pub struct CharacterMapBuilder {
    blocks: FxHashMap<u32, Block>,
}

impl CharacterMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, cp: u32) {
        if cp > MAX_CODEPOINT {
            return;
        }
        let (block, word, mask) = split(cp);
        self.blocks.entry(block).or_insert([0; 4])[word] |= mask;
    }

    pub fn set_range(&mut self, start: u32, end: u32) {
        for cp in start..=end.min(MAX_CODEPOINT) {
            self.set(cp);
        }
    }

    pub fn clear(&mut self, cp: u32) {
        if cp > MAX_CODEPOINT {
            return;
        }
        let (block, word, mask) = split(cp);
        if let Some(b) = self.blocks.get_mut(&block) {
            b[word] &= !mask;
        }
    }

    pub fn clear_range(&mut self, start: u32, end: u32) {
        for cp in start..=end.min(MAX_CODEPOINT) {
            self.clear(cp);
        }
    }

    pub fn contains(&self, cp: u32) -> bool {
        if cp > MAX_CODEPOINT {
            return false;
        }
        let (block, word, mask) = split(cp);
        self
            .blocks
            .get(&block)
            .map_or(false, |b| b[word] & mask != 0)
    }

    /// True if any code point in `start..=end` is set.
    pub fn any_in_range(&self, start: u32, end: u32) -> bool {
        (start..=end.min(MAX_CODEPOINT)).any(|cp| self.contains(cp))
    }

    /// Freezes into an immutable, hash-stamped map. Empty blocks left
    /// behind by clears are dropped so identical coverage always hashes
    /// identically.
    pub fn freeze(mut self) -> CharacterMap {
        self.blocks.retain(|_, b| b.iter().any(|w| *w != 0));

        let mut indices: Vec<u32> = self.blocks.keys().copied().collect();
        indices.sort_unstable();

        let mut hasher = FxHasher::default();
        let mut len = 0usize;
        for idx in &indices {
            let block = &self.blocks[idx];
            idx.hash(&mut hasher);
            block.hash(&mut hasher);
            len += block.iter().map(|w| w.count_ones() as usize).sum::<usize>();
        }

        CharacterMap {
            blocks: self.blocks,
            hash: hasher.finish(),
            len,
        }
    }
}

/// Immutable character coverage set.
///
/// Never mutated after construction; safe to share across threads
/// behind an `Arc`. Content-equal maps compare equal and carry the
/// same hash, which the interner relies on.
#[derive(Debug, Clone)]
pub struct CharacterMap {
    blocks: FxHashMap<u32, Block>,
    hash: u64,
    len: usize,
}

impl CharacterMap {
    /// An empty map (covers nothing).
    pub fn empty() -> Self {
        CharacterMapBuilder::new().freeze()
    }

    pub fn contains(&self, cp: u32) -> bool {
        if cp > MAX_CODEPOINT {
            return false;
        }
        let (block, word, mask) = split(cp);
        self
            .blocks
            .get(&block)
            .map_or(false, |b| b[word] & mask != 0)
    }

    pub fn any_in_range(&self, start: u32, end: u32) -> bool {
        (start..=end.min(MAX_CODEPOINT)).any(|cp| self.contains(cp))
    }

    /// Number of covered code points.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Content hash, stable across identical coverage.
    pub fn content_hash(&self) -> u64 {
        self.hash
    }

    /// Reopens the map for mutation (used by the complex-script filter).
    pub fn thaw(&self) -> CharacterMapBuilder {
        CharacterMapBuilder {
            blocks: self.blocks.clone(),
        }
    }

    /// Raw (block index, words) pairs in ascending index order, for
    /// snapshot export.
    pub fn to_blocks(&self) -> Vec<(u32, [u64; 4])> {
        let mut blocks: Vec<(u32, Block)> = self.blocks.iter().map(|(i, b)| (*i, *b)).collect();
        blocks.sort_unstable_by_key(|(i, _)| *i);
        blocks
    }

    /// Rebuilds a map from exported blocks.
    pub fn from_blocks(blocks: impl IntoIterator<Item = (u32, [u64; 4])>) -> Self {
        let builder = CharacterMapBuilder {
            blocks: blocks.into_iter().collect(),
        };
        builder.freeze()
    }
}

impl PartialEq for CharacterMap {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.len == other.len && self.blocks == other.blocks
    }
}

impl Eq for CharacterMap {}

/// Parses a raw `cmap` table into a coverage builder plus the byte
/// offset of the Unicode variation-sequence sub-table, if present.
///
/// Only the Unicode encodings are read: format 4 for the BMP and
/// format 12 for the full range, matching what installed fonts carry
/// in practice. Anything malformed is a `ParseFailure`; the caller
/// treats the face as covering nothing.
pub fn parse_cmap(data: &[u8]) -> Result<(CharacterMapBuilder, Option<u32>)> {
    let table = ttf_parser::cmap::Table::parse(data)
        .ok_or_else(|| CatalogError::parse("cmap", "invalid table header"))?;

    let mut builder = CharacterMapBuilder::new();
    let mut saw_unicode = false;

    for subtable in table.subtables {
        if !subtable.is_unicode() {
            continue;
        }
        match subtable.format {
            ttf_parser::cmap::Format::SegmentMappingToDeltaValues(_)
            | ttf_parser::cmap::Format::SegmentedCoverage(_) => {
                saw_unicode = true;
                subtable.codepoints(|cp| builder.set(cp));
            }
            _ => {}
        }
    }

    if !saw_unicode {
        return Err(CatalogError::parse("cmap", "no usable Unicode sub-table"));
    }

    Ok((builder, find_uvs_offset(data)))
}

/// Locates the format 14 (Unicode variation sequences) sub-table by
/// walking the encoding records of the raw table.
fn find_uvs_offset(data: &[u8]) -> Option<u32> {
    let read_u16 = |at: usize| -> Option<u16> {
        data.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    };
    let read_u32 = |at: usize| -> Option<u32> {
        data
            .get(at..at + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    };

    let num_tables = read_u16(2)? as usize;
    for i in 0..num_tables {
        let record = 4 + i * 8;
        let offset = read_u32(record + 4)?;
        if read_u16(offset as usize)? == 14 {
            return Some(offset);
        }
    }
    None
}

/// Content-hash interner for published character maps.
///
/// Owned by the catalog (never a process-global), so teardown and
/// rebuild lifecycles stay explicit. Entries are weak: a map lives as
/// long as some face holds it, and dead slots are pruned on insert.
#[derive(Debug, Default)]
pub struct CharmapInterner {
    inner: Mutex<FxHashMap<u64, Vec<Weak<CharacterMap>>>>,
}

impl CharmapInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a shared handle to a map with identical content, storing
    /// `map` if none exists yet.
    pub fn intern(&self, map: CharacterMap) -> Arc<CharacterMap> {
        let mut inner = self.inner.lock();
        let slot = inner.entry(map.content_hash()).or_default();

        slot.retain(|weak| weak.strong_count() > 0);
        for weak in slot.iter() {
            if let Some(existing) = weak.upgrade() {
                if *existing == map {
                    return existing;
                }
            }
        }

        let shared = Arc::new(map);
        slot.push(Arc::downgrade(&shared));
        shared
    }

    /// Number of live interned maps.
    pub fn len(&self) -> usize {
        self
            .inner
            .lock()
            .values()
            .map(|slot| slot.iter().filter(|w| w.strong_count() > 0).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
