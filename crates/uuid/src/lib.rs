//! Identifier utilities.
//!
//! The triage engine hands out two kinds of identifiers:
//!
//! - **Session identifiers**: a *canonical* UUID, **32 lowercase hexadecimal characters** (no
//!   hyphens), wrapped in [`UuidService`].
//! - **Report identifiers**: a time-prefixed [`TimestampUuid`] of the form
//!   `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`, so that reports sort by creation time and remain
//!   globally unique.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Canonical form is *required* for externally supplied identifiers (for example, from CLI/API
//! inputs). Use [`UuidService::parse`] to validate an input string. Non-canonical values
//! (uppercase, hyphenated, wrong length, non-hex) are rejected.

mod service;

// Re-export public types
pub use service::{TimestampUuid, TimestampUuidGenerator, Uuid, UuidService};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
