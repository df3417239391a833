//! Consultation records and their status machine.
//!
//! ```text
//! preliminar -> aprovada | cancelada | realizada
//! aprovada   -> aprovada (re-approval) | cancelada | realizada
//! cancelada  -> (terminal)
//! realizada  -> (terminal)
//! ```

use crate::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use triage_types::{ConsultationId, DiseaseId, DoctorId, PatientId, RecommendationId, SymptomId};

/// Consultation status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    /// Submitted by the patient, awaiting a doctor.
    Preliminar,
    /// A doctor has chosen a diagnosis.
    Aprovada,
    Cancelada,
    Realizada,
}

impl ConsultationStatus {
    pub const ALL: [ConsultationStatus; 4] = [
        ConsultationStatus::Preliminar,
        ConsultationStatus::Aprovada,
        ConsultationStatus::Cancelada,
        ConsultationStatus::Realizada,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Preliminar => "preliminar",
            ConsultationStatus::Aprovada => "aprovada",
            ConsultationStatus::Cancelada => "cancelada",
            ConsultationStatus::Realizada => "realizada",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Cancelada | ConsultationStatus::Realizada
        )
    }

    /// Whether `self → target` is an edge of the status machine.
    ///
    /// `aprovada → aprovada` is allowed: re-approval corrects the diagnosis in place.
    pub fn can_transition_to(&self, target: ConsultationStatus) -> bool {
        use ConsultationStatus::*;
        matches!(
            (self, target),
            (Preliminar, Aprovada)
                | (Preliminar, Cancelada)
                | (Preliminar, Realizada)
                | (Aprovada, Aprovada)
                | (Aprovada, Cancelada)
                | (Aprovada, Realizada)
        )
    }

    /// Parses a comma-separated filter such as `aprovada,realizada`.
    ///
    /// Blank entries are skipped; an all-blank filter yields an empty set, meaning "any status".
    pub fn parse_filter(input: &str) -> TriageResult<BTreeSet<ConsultationStatus>> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsultationStatus {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConsultationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| TriageError::Validation(format!("unknown consultation status '{s}'")))
    }
}

/// A scored disease for a reported symptom set. Derived data, recomputable at any time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisCandidate {
    pub disease_id: DiseaseId,
    pub disease_name: String,
    /// Share of the disease's symptom profile covered by the report, in `[0, 100]`.
    pub percentage: f64,
    pub common_symptom_names: Vec<String>,
    pub missing_symptom_names: Vec<String>,
}

/// One patient encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: ConsultationId,
    pub patient_id: PatientId,
    /// Fixed at creation.
    pub symptom_ids: BTreeSet<SymptomId>,
    pub description: Option<String>,
    pub status: ConsultationStatus,
    pub chosen_disease_id: Option<DiseaseId>,
    pub medical_recommendation_ids: Vec<RecommendationId>,
    pub free_recommendations: Vec<String>,
    /// Candidates computed at creation; `None` when there was nothing to score.
    pub diagnostic_candidates: Option<Vec<DiagnosisCandidate>>,
    pub doctor_id: Option<DoctorId>,
    /// Never changes after creation.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consultation {
    /// A fresh `preliminar` consultation.
    pub fn new(
        patient_id: PatientId,
        symptom_ids: BTreeSet<SymptomId>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConsultationId::new(),
            patient_id,
            symptom_ids,
            description,
            status: ConsultationStatus::Preliminar,
            chosen_disease_id: None,
            medical_recommendation_ids: Vec::new(),
            free_recommendations: Vec::new(),
            diagnostic_candidates: None,
            doctor_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fails with [`TriageError::Conflict`] unless `self.status → target` is a legal edge.
    pub fn ensure_can_transition(&self, target: ConsultationStatus) -> TriageResult<()> {
        if self.status.can_transition_to(target) {
            return Ok(());
        }
        Err(TriageError::Conflict(format!(
            "consultation {} cannot move from {} to {}",
            self.id, self.status, target
        )))
    }

    /// Moves to `target`, stamping `updated_at`.
    pub fn transition(&mut self, target: ConsultationStatus, now: DateTime<Utc>) -> TriageResult<()> {
        self.ensure_can_transition(target)?;
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// Appends free-text recommendations, skipping blanks and exact duplicates.
    pub fn append_free_recommendations<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            let text = item.as_ref().trim();
            if text.is_empty() || self.free_recommendations.iter().any(|t| t == text) {
                continue;
            }
            self.free_recommendations.push(text.to_owned());
        }
    }
}
