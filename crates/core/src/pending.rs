//! Doctor worklist.
//!
//! Builds one summary per open consultation, each carrying the reported symptom names and the
//! top-K diagnosis candidates. Catalog access is batched: the disease list is read once and the
//! names of every symptom referenced anywhere (reports and disease profiles) are resolved in a
//! single call, so cost grows with consultations + distinct symptoms + diseases rather than
//! with their product.

use crate::consultation::{Consultation, ConsultationStatus, DiagnosisCandidate};
use crate::matcher::{rank_diseases, referenced_symptom_ids, SymptomNames};
use crate::TriageResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_catalog::CatalogStore;
use triage_types::{ConsultationId, PatientId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsultationSummary {
    pub id: ConsultationId,
    pub patient_id: PatientId,
    pub status: ConsultationStatus,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    pub symptom_names: Vec<String>,
    pub candidates: Vec<DiagnosisCandidate>,
}

/// Summarises `consultations`, oldest first, with at most `top_k` candidates each.
pub fn build_pending_view(
    consultations: &[Consultation],
    catalog: &dyn CatalogStore,
    top_k: usize,
) -> TriageResult<Vec<ConsultationSummary>> {
    if consultations.is_empty() {
        return Ok(Vec::new());
    }

    let diseases = catalog.diseases()?;
    let referenced = referenced_symptom_ids(
        consultations.iter().flat_map(|c| c.symptom_ids.iter()),
        &diseases,
    );
    let names = SymptomNames::from_symptoms(&catalog.symptoms_by_ids(&referenced)?);

    let mut summaries: Vec<ConsultationSummary> = consultations
        .iter()
        .map(|c| ConsultationSummary {
            id: c.id,
            patient_id: c.patient_id,
            status: c.status,
            created_at: c.created_at,
            description: c.description.clone(),
            symptom_names: names.names_of(&c.symptom_ids),
            candidates: rank_diseases(&c.symptom_ids, &diseases, &names, top_k),
        })
        .collect();
    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    Ok(summaries)
}
