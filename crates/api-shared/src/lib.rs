//! # API Shared
//!
//! Shared definitions for the triage APIs.
//!
//! Contains:
//! - JSON wire types with OpenAPI schemas (`dto` module)
//! - Caller identity parsing and role checks (`auth` module)
//! - `HealthService`
//!
//! Used by `api-rest`; nothing in here depends on an HTTP framework.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{Actor, AuthError, Role};
pub use health::{HealthRes, HealthService};
