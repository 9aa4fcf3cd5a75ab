//! Complex-script coverage filtering.
//!
//! Fonts can claim cmap coverage for scripts they cannot actually
//! shape: the glyphs exist, but the layout tables needed for contextual
//! shaping (Arabic joining, Indic reordering, Lao/Tibetan stacking) do
//! not. Trusting such coverage produces visually broken runs, so the
//! claimed ranges are trimmed down to what is safe to use.
//!
//! The rules, per face:
//! 1. AAT layout tables (`morx`/`mort`) without OpenType `GSUB`/`GPOS`,
//!    or the AAT-specific `kerx` kerning table at all, mean the face
//!    must be shaped by the alternate (AAT) engine.
//! 2. A claimed complex range is kept only if the alternate engine will
//!    handle it, or `GSUB` explicitly declares the script's tag.
//! 3. A configured blocklist of families known to report spurious blank
//!    glyphs gets fixed Tibetan/Arabic points cleared unconditionally.
//!
//! The filter is removal-only and idempotent: it never adds coverage,
//! and running it twice equals running it once.

use crate::charmap::CharacterMapBuilder;
use crate::provider::{tag, Tag};

/// Layout-table presence flags for one face.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutCapabilities {
    pub has_aat_layout: bool,
    pub has_apple_kerning: bool,
    pub has_gsub: bool,
    pub has_gpos: bool,
}

impl LayoutCapabilities {
    /// Whether the face must be shaped by the alternate (AAT) engine
    /// rather than the default OpenType shaper.
    pub fn requires_alternate_shaping(&self) -> bool {
        (self.has_aat_layout && !(self.has_gsub || self.has_gpos)) || self.has_apple_kerning
    }
}

/// A Unicode range requiring contextual shaping, with the OpenType
/// script tags (newer first) that declare support for it.
pub struct ScriptRange {
    pub start: u32,
    pub end: u32,
    pub tags: &'static [Tag],
}

/// Complex-script ranges checked against claimed coverage.
///
/// Indic ranges list both the v2 and the original script tags.
pub const COMPLEX_SCRIPT_RANGES: &[ScriptRange] = &[
    ScriptRange { start: 0x0600, end: 0x06FF, tags: &[tag(b"arab")] },
    ScriptRange { start: 0x0700, end: 0x074F, tags: &[tag(b"syrc")] },
    ScriptRange { start: 0x0750, end: 0x077F, tags: &[tag(b"arab")] },
    ScriptRange { start: 0x08A0, end: 0x08FF, tags: &[tag(b"arab")] },
    ScriptRange { start: 0x0900, end: 0x097F, tags: &[tag(b"dev2"), tag(b"deva")] },
    ScriptRange { start: 0x0980, end: 0x09FF, tags: &[tag(b"bng2"), tag(b"beng")] },
    ScriptRange { start: 0x0A00, end: 0x0A7F, tags: &[tag(b"gur2"), tag(b"guru")] },
    ScriptRange { start: 0x0A80, end: 0x0AFF, tags: &[tag(b"gjr2"), tag(b"gujr")] },
    ScriptRange { start: 0x0B00, end: 0x0B7F, tags: &[tag(b"ory2"), tag(b"orya")] },
    ScriptRange { start: 0x0B80, end: 0x0BFF, tags: &[tag(b"tml2"), tag(b"taml")] },
    ScriptRange { start: 0x0C00, end: 0x0C7F, tags: &[tag(b"tel2"), tag(b"telu")] },
    ScriptRange { start: 0x0C80, end: 0x0CFF, tags: &[tag(b"knd2"), tag(b"knda")] },
    ScriptRange { start: 0x0D00, end: 0x0D7F, tags: &[tag(b"mlm2"), tag(b"mlym")] },
    ScriptRange { start: 0x0D80, end: 0x0DFF, tags: &[tag(b"sinh")] },
    ScriptRange { start: 0x0E80, end: 0x0EFF, tags: &[tag(b"lao ")] },
    ScriptRange { start: 0x0F00, end: 0x0FFF, tags: &[tag(b"tibt")] },
    ScriptRange { start: 0x1000, end: 0x109F, tags: &[tag(b"mym2"), tag(b"mymr")] },
    ScriptRange { start: 0x1780, end: 0x17FF, tags: &[tag(b"khmr")] },
];

// Known-defective faces report blank glyphs for these obscure Tibetan
// and Arabic-script code points despite using the alternate shaper.
const BLOCKLIST_CLEARS: &[(u32, u32)] = &[
    (0x0F6B, 0x0F70),
    (0x0F8C, 0x0F8F),
    (0x0F98, 0x0F98),
    (0x0FBD, 0x0FBD),
    (0x0FCD, 0x0FFF),
    (0x0620, 0x0620),
    (0x065F, 0x065F),
    (0x06EE, 0x06EF),
    (0x06FF, 0x06FF),
];

/// Outcome of filtering one face's claimed coverage.
#[derive(Debug)]
pub struct FilterOutcome {
    /// Whether the face must be shaped by the alternate engine.
    pub requires_alternate_shaping: bool,
    /// Ranges cleared from the claimed coverage (for logging).
    pub cleared_ranges: usize,
}

/// Trims a coverage builder in place.
///
/// `gsub` is the raw `GSUB` table when present; `family_name` and
/// `blocklist` drive the known-defective clears. Removal-only: the
/// builder never gains code points here.
pub fn apply(
    coverage: &mut CharacterMapBuilder,
    caps: &LayoutCapabilities,
    gsub: Option<&[u8]>,
    family_name: &str,
    blocklist: &[String],
) -> FilterOutcome {
    let mut requires_aat = caps.requires_alternate_shaping();
    let mut cleared = 0usize;

    for range in COMPLEX_SCRIPT_RANGES {
        if !coverage.any_in_range(range.start, range.end) {
            continue;
        }
        if caps.has_aat_layout {
            // Prefer the alternate shaper for AAT complex-script fonts even
            // when they also carry some OpenType tables, and trust the AAT
            // tables to provide the shaping for these ranges.
            requires_aat = true;
            continue;
        }
        // GSUB is the bar here; GPOS alone cannot substitute contextual forms.
        if caps.has_gsub {
            if let Some(gsub) = gsub {
                if gsub_supports_script(gsub, range.tags) {
                    continue;
                }
            }
        }
        coverage.clear_range(range.start, range.end);
        cleared += 1;
    }

    if requires_aat
        && blocklist
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(family_name))
    {
        for &(start, end) in BLOCKLIST_CLEARS {
            coverage.clear_range(start, end);
        }
        cleared += BLOCKLIST_CLEARS.len();
    }

    FilterOutcome {
        requires_alternate_shaping: requires_aat,
        cleared_ranges: cleared,
    }
}

/// Checks whether a raw `GSUB` table declares any of the given script
/// tags in its ScriptList.
///
/// Reads only the script records; a malformed table reads as "no".
pub fn gsub_supports_script(gsub: &[u8], tags: &[Tag]) -> bool {
    let read_u16 = |at: usize| -> Option<u16> {
        gsub.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    };
    let read_u32 = |at: usize| -> Option<u32> {
        gsub
            .get(at..at + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    };

    // Header: version, then the ScriptList offset.
    let version = match read_u32(0) {
        Some(v) => v,
        None => return false,
    };
    if version >> 16 != 1 {
        return false;
    }
    let script_list = match read_u16(4) {
        Some(off) => off as usize,
        None => return false,
    };
    let count = match read_u16(script_list) {
        Some(c) => c as usize,
        None => return false,
    };

    for i in 0..count {
        let record = script_list + 2 + i * 6;
        let script_tag = match read_u32(record) {
            Some(t) => t,
            None => return false,
        };
        if tags.contains(&script_tag) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charmap::CharacterMapBuilder;

    /// Minimal GSUB table: header plus a ScriptList of the given tags.
    fn gsub_with_scripts(tags: &[&[u8; 4]]) -> Vec<u8> {
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

    fn arabic_coverage() -> CharacterMapBuilder {
        let mut b = CharacterMapBuilder::new();
        b.set_range(0x0620, 0x064A);
        b.set_range(0x0041, 0x005A);
        b
    }

    #[test]
    fn aat_without_opentype_requires_alternate_shaping() {
        let caps = LayoutCapabilities {
            has_aat_layout: true,
            ..Default::default()
        };
        assert!(caps.requires_alternate_shaping());

        let with_otl = LayoutCapabilities {
            has_aat_layout: true,
            has_gsub: true,
            ..Default::default()
        };
        assert!(!with_otl.requires_alternate_shaping());
    }

    #[test]
    fn apple_kerning_alone_requires_alternate_shaping() {
        let caps = LayoutCapabilities {
            has_apple_kerning: true,
            has_gsub: true,
            has_gpos: true,
            ..Default::default()
        };
        assert!(caps.requires_alternate_shaping());
    }

    #[test]
    fn claimed_arabic_without_layout_support_is_cleared() {
        let mut coverage = arabic_coverage();
        let outcome = apply(
            &mut coverage,
            &LayoutCapabilities::default(),
            None,
            "Some Font",
            &[],
        );
        assert!(!outcome.requires_alternate_shaping);
        assert!(!coverage.contains(0x0620));
        // Non-complex coverage survives.
        assert!(coverage.contains(0x0041));
    }

    #[test]
    fn gsub_script_declaration_preserves_coverage() {
        let gsub = gsub_with_scripts(&[b"arab"]);
        let caps = LayoutCapabilities {
            has_gsub: true,
            ..Default::default()
        };
        let mut coverage = arabic_coverage();
        apply(&mut coverage, &caps, Some(&gsub), "Some Font", &[]);
        assert!(coverage.contains(0x0620));
    }

    #[test]
    fn gsub_with_wrong_script_does_not_help() {
        let gsub = gsub_with_scripts(&[b"latn", b"cyrl"]);
        let caps = LayoutCapabilities {
            has_gsub: true,
            ..Default::default()
        };
        let mut coverage = arabic_coverage();
        apply(&mut coverage, &caps, Some(&gsub), "Some Font", &[]);
        assert!(!coverage.contains(0x0620));
    }

    #[test]
    fn aat_layout_keeps_complex_ranges() {
        let caps = LayoutCapabilities {
            has_aat_layout: true,
            ..Default::default()
        };
        let mut coverage = arabic_coverage();
        let outcome = apply(&mut coverage, &caps, None, "Some Font", &[]);
        assert!(outcome.requires_alternate_shaping);
        assert!(coverage.contains(0x0620));
    }

    #[test]
    fn blocklisted_family_loses_fixed_points_despite_aat() {
        let caps = LayoutCapabilities {
            has_aat_layout: true,
            ..Default::default()
        };
        let mut coverage = arabic_coverage();
        coverage.set_range(0x0F6B, 0x0F70);
        let blocklist = vec!["Songti SC".to_string()];

        let outcome = apply(&mut coverage, &caps, None, "Songti SC", &blocklist);
        assert!(outcome.requires_alternate_shaping);
        assert!(!coverage.contains(0x0620));
        assert!(!coverage.any_in_range(0x0F6B, 0x0F70));
        // Ordinary Arabic letters stay: AAT shaping is still trusted
        // outside the known-bad points.
        assert!(coverage.contains(0x0628));
    }

    #[test]
    fn filter_is_idempotent() {
        let caps = LayoutCapabilities::default();
        let mut once = arabic_coverage();
        apply(&mut once, &caps, None, "Some Font", &[]);
        let first = once.clone().freeze();

        apply(&mut once, &caps, None, "Some Font", &[]);
        let second = once.freeze();
        assert_eq!(first, second);
    }

    #[test]
    fn filter_never_adds_codepoints() {
        let caps = LayoutCapabilities {
            has_aat_layout: true,
            has_apple_kerning: true,
            ..Default::default()
        };
        let mut coverage = arabic_coverage();
        let before = coverage.clone().freeze();
        apply(&mut coverage, &caps, None, "Some Font", &[]);
        let after = coverage.freeze();
        for cp in 0x0000..0x0800u32 {
            if after.contains(cp) {
                assert!(before.contains(cp), "U+{cp:04X} appeared from nowhere");
            }
        }
    }

    #[test]
    fn truncated_gsub_reads_as_unsupported() {
        let gsub = gsub_with_scripts(&[b"arab"]);
        assert!(!gsub_supports_script(&gsub[..6], &[tag(b"arab")]));
        assert!(!gsub_supports_script(&[], &[tag(b"arab")]));
    }
}
