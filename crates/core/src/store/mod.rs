//! Consultation persistence.
//!
//! The lifecycle only talks to [`ConsultationRepository`]. Two implementations ship:
//! - [`InMemoryConsultationRepository`] for tests and throwaway runs
//! - [`FileConsultationRepository`] storing one JSON document per consultation under a sharded
//!   directory tree
//!
//! Mutations go through [`ConsultationRepository::update`], which applies a closure to the
//! *stored* record under the repository's lock and commits the result only if the closure
//! succeeds. Two concurrent doctor actions therefore serialise instead of overwriting each
//! other, and a rejected action leaves the stored record untouched.

mod file;
mod memory;

pub use file::FileConsultationRepository;
pub use memory::InMemoryConsultationRepository;

use crate::consultation::Consultation;
use crate::TriageResult;
use triage_types::ConsultationId;

/// Closure applied to a stored consultation inside [`ConsultationRepository::update`].
pub type Mutation<'a> = dyn FnMut(&mut Consultation) -> TriageResult<()> + 'a;

pub trait ConsultationRepository: Send + Sync {
    /// Stores a new consultation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TriageError::Conflict`] if the id is already taken.
    fn insert(&self, consultation: &Consultation) -> TriageResult<()>;

    fn get(&self, id: ConsultationId) -> TriageResult<Option<Consultation>>;

    /// All stored consultations, oldest first.
    fn list(&self) -> TriageResult<Vec<Consultation>>;

    /// Atomic read-modify-write of one consultation.
    ///
    /// `apply` receives a copy of the stored record; the copy replaces the stored record only
    /// when `apply` returns `Ok`. Returns the committed record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TriageError::NotFound`] if no such consultation exists, or whatever
    /// `apply` returned.
    fn update(&self, id: ConsultationId, apply: &mut Mutation<'_>) -> TriageResult<Consultation>;
}

fn sort_oldest_first(consultations: &mut [Consultation]) {
    consultations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
