//! Catalog boundary for the triage engine.
//!
//! The catalog is the administrator-owned reference data the engine reads but never writes:
//! symptoms, diseases (each with the set of symptoms it presents) and the recommendation texts
//! attached to either.
//!
//! This crate provides:
//! - strongly typed domain records ([`Symptom`], [`Disease`], [`Recommendation`])
//! - the [`CatalogStore`] trait the engine consumes
//! - [`Catalog`], an immutable in-memory store with referential validation
//! - YAML loading with a strict wire schema ([`Catalog::from_yaml`], [`Catalog::load`])
//!
//! All validation happens here, once, when the data enters the process. Consumers can assume
//! names are non-blank, ids are canonical and every cross-reference resolves.

mod model;
mod store;
mod yaml;

pub use model::{Disease, Recommendation, Symptom};
pub use store::{Catalog, CatalogStore};

/// Errors returned by the catalog boundary.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{owner} references unknown {kind} {id}")]
    UnknownReference {
        owner: String,
        kind: &'static str,
        id: String,
    },
}

/// Type alias for Results that can fail with a [`CatalogError`].
pub type CatalogResult<T> = Result<T, CatalogError>;
