//! Error types for the font catalog.
//!
//! The catalog's failure policy is deliberately soft: a malformed font
//! table degrades to empty coverage, a failed provider call makes a
//! family or face look absent, and a name that resolves to nothing is a
//! `None` at the query surface rather than an error. The variants here
//! exist for the few places where the *reason* matters to a caller
//! (diagnostics, logging), not to abort anything.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors produced while building or querying the catalog.
///
/// None of these are fatal. `ParseFailure` means the face is treated as
/// covering nothing; `ProviderUnavailable` means the family or face is
/// treated as absent for the current request and is not retried within
/// that request.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    /// A binary font table could not be parsed.
    #[error("malformed '{table}' table: {reason}")]
    ParseFailure { table: &'static str, reason: String },

    /// A call into the platform font provider failed.
    #[error("font provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },
}

impl CatalogError {
    /// Shorthand for a `ParseFailure` on a named table.
    pub fn parse(table: &'static str, reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            table,
            reason: reason.into(),
        }
    }

    /// Shorthand for a `ProviderUnavailable` error.
    pub fn provider(reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            reason: reason.into(),
        }
    }
}
