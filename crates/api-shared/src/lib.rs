//! # API Shared
//!
//! Shared definitions for the triage APIs.
//!
//! Contains:
//! - Wire DTOs with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
