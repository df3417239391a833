use super::{sort_oldest_first, ConsultationRepository, Mutation};
use crate::consultation::Consultation;
use crate::{TriageError, TriageResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use triage_types::ConsultationId;

/// Process-local consultation store.
#[derive(Debug, Default)]
pub struct InMemoryConsultationRepository {
    records: Mutex<BTreeMap<ConsultationId, Consultation>>,
}

impl InMemoryConsultationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> TriageResult<MutexGuard<'_, BTreeMap<ConsultationId, Consultation>>> {
        self.records.lock().map_err(|_| TriageError::LockPoisoned)
    }
}

impl ConsultationRepository for InMemoryConsultationRepository {
    fn insert(&self, consultation: &Consultation) -> TriageResult<()> {
        let mut records = self.records()?;
        if records.contains_key(&consultation.id) {
            return Err(TriageError::Conflict(format!(
                "consultation {} already exists",
                consultation.id
            )));
        }
        records.insert(consultation.id, consultation.clone());
        Ok(())
    }

    fn get(&self, id: ConsultationId) -> TriageResult<Option<Consultation>> {
        Ok(self.records()?.get(&id).cloned())
    }

    fn list(&self) -> TriageResult<Vec<Consultation>> {
        let mut all: Vec<_> = self.records()?.values().cloned().collect();
        sort_oldest_first(&mut all);
        Ok(all)
    }

    fn update(&self, id: ConsultationId, apply: &mut Mutation<'_>) -> TriageResult<Consultation> {
        let mut records = self.records()?;
        let stored = records
            .get(&id)
            .ok_or_else(|| TriageError::NotFound(format!("consultation {id}")))?;

        let mut working = stored.clone();
        apply(&mut working)?;
        records.insert(id, working.clone());
        Ok(working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consultation::ConsultationStatus;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use triage_types::PatientId;

    fn consultation() -> Consultation {
        Consultation::new(PatientId::new(), BTreeSet::new(), None, Utc::now())
    }

    #[test]
    fn failed_update_leaves_record_unchanged() {
        let repo = InMemoryConsultationRepository::new();
        let c = consultation();
        repo.insert(&c).unwrap();

        let err = repo
            .update(c.id, &mut |rec| {
                rec.append_free_recommendations(["half-applied"]);
                Err(TriageError::Validation("rejected".into()))
            })
            .unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
        assert_eq!(repo.get(c.id).unwrap().unwrap(), c);
    }

    #[test]
    fn update_of_missing_record_is_not_found() {
        let repo = InMemoryConsultationRepository::new();
        let err = repo
            .update(triage_types::ConsultationId::new(), &mut |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, TriageError::NotFound(_)));
    }

    #[test]
    fn duplicate_insert_is_a_conflict() {
        let repo = InMemoryConsultationRepository::new();
        let c = consultation();
        repo.insert(&c).unwrap();
        assert!(matches!(repo.insert(&c), Err(TriageError::Conflict(_))));
    }

    #[test]
    fn concurrent_updates_are_all_retained() {
        let repo = Arc::new(InMemoryConsultationRepository::new());
        let c = consultation();
        repo.insert(&c).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let repo = repo.clone();
                std::thread::spawn(move || {
                    repo.update(c.id, &mut |rec| {
                        rec.append_free_recommendations([format!("note {n}")]);
                        rec.status = ConsultationStatus::Aprovada;
                        Ok(())
                    })
                    .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = repo.get(c.id).unwrap().unwrap();
        assert_eq!(stored.free_recommendations.len(), 8);
    }

    #[test]
    fn list_is_oldest_first() {
        let repo = InMemoryConsultationRepository::new();
        let mut older = consultation();
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        let newer = consultation();
        repo.insert(&newer).unwrap();
        repo.insert(&older).unwrap();

        let listed = repo.list().unwrap();
        assert_eq!(listed[0].id, older.id);
        assert_eq!(listed[1].id, newer.id);
    }
}
