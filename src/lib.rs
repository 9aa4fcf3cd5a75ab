//! Per-process font catalog and resolution engine.
//!
//! Enumerates the fonts available from a [`provider::FontProvider`],
//! builds normalized metadata for each face (weight/stretch/slant
//! ranges, fixed-pitch flag, character coverage), and answers "which
//! installed face should render this style, or this character?"
//! including a validated last-resort fallback path.
//!
//! The catalog is cheap to query concurrently: families and coverage
//! populate lazily under fine-grained locks, results are shared as
//! `Arc`s, and a full [`catalog::FontCatalog::rebuild`] swaps state
//! atomically underneath live readers. A built catalog can also be
//! exported as a [`snapshot::CatalogSnapshot`] and imported read-only
//! in another process.

pub mod catalog;
pub mod charmap;
pub mod config;
pub mod error;
pub mod face;
pub mod fallback;
pub mod family;
pub mod provider;
pub mod script_filter;
pub mod snapshot;
pub mod style;
pub mod system;

pub use catalog::{DiagnosticsSnapshot, FontCatalog};
pub use charmap::{CharacterMap, CharacterMapBuilder};
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use face::FontFace;
pub use fallback::{FallbackMatch, FallbackResolver};
pub use family::FontFamily;
pub use provider::{FaceDescriptor, FamilyAlias, FontProvider, StyleTraits};
pub use snapshot::{import_snapshot, CatalogSnapshot};
pub use style::{FontStretch, FontWeight, SlantStyle, StyleRequest};
pub use system::SystemFontProvider;
