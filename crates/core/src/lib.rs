//! # Triage Core
//!
//! Business logic for symptom triage consultations:
//! - matching reported symptoms against the disease catalog ([`matcher`])
//! - merging disease and symptom recommendations ([`recommendations`])
//! - the consultation status machine and its service ([`consultation`], [`lifecycle`])
//! - the doctor worklist ([`pending`])
//! - consultation persistence ([`store`])
//!
//! **No API concerns**: authentication, HTTP servers and wire DTOs belong in `api-rest` and
//! `api-shared`.

pub mod config;
pub mod constants;
pub mod consultation;
pub mod error;
pub mod extraction;
pub mod lifecycle;
pub mod matcher;
pub mod pending;
pub mod recommendations;
pub mod store;

pub use config::{CoreConfig, ExtractorConfig};
pub use consultation::{Consultation, ConsultationStatus, DiagnosisCandidate};
pub use error::{TriageError, TriageResult};
pub use extraction::{DisabledExtractor, OllamaExtractor, SymptomExtractor};
pub use lifecycle::{Approval, ConsultationService, CreatedConsultation, NewConsultation};
pub use pending::ConsultationSummary;
pub use recommendations::{AggregatedRecommendation, RecommendationOrigin};
pub use store::{ConsultationRepository, FileConsultationRepository, InMemoryConsultationRepository};
