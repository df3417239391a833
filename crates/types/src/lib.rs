//! # Triage Types
//!
//! Small, validated primitives shared by every triage crate:
//! - canonical identifiers ([`SymptomId`], [`DiseaseId`], [`ConsultationId`], ...)
//! - [`NonEmptyText`] for names and recommendation text
//!
//! Nothing in here performs I/O.

mod ids;
mod text;

pub use ids::{
    is_canonical, ConsultationId, DiseaseId, DoctorId, PatientId, RecommendationId, SymptomId,
};
pub use text::NonEmptyText;

/// Errors raised while constructing validated primitives.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    EmptyText,

    /// An identifier was not in canonical form
    #[error("invalid {kind} id: expected 32 lowercase hex characters without hyphens, got '{value}'")]
    InvalidId { kind: &'static str, value: String },
}
