//! JSON wire types for the REST surface.
//!
//! Request ids travel as plain strings and are parsed by the handlers, so a malformed id becomes a
//! `400` with a precise message instead of a generic body rejection. Response field names are
//! camelCase except for the approval body, whose Portuguese snake_case keys are part of the public
//! contract.

use serde::{Deserialize, Serialize};
use triage_core::{
    AggregatedRecommendation, Consultation, ConsultationSummary, DiagnosisCandidate,
};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsultationReq {
    /// Explicitly selected symptom ids.
    #[serde(default)]
    pub symptom_ids: Vec<String>,
    /// Free-text complaint for automatic symptom extraction.
    pub description: Option<String>,
    /// Required when a doctor files on a patient's behalf.
    pub patient_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct ApproveReq {
    /// Chosen disease id.
    pub doenca: Option<String>,
    /// Replaces the medical recommendations when present.
    pub recomendacoes_medicos: Option<Vec<String>>,
    pub notas: Option<String>,
    pub diagnostico_final: Option<String>,
    #[serde(default)]
    pub recomendacoes_livres: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportsQuery {
    /// Comma-separated statuses, e.g. `aprovada,realizada`. Omitted means every status.
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRes {
    pub disease_id: String,
    pub disease_name: String,
    pub percentage: f64,
    pub common_symptom_names: Vec<String>,
    pub missing_symptom_names: Vec<String>,
}

impl From<&DiagnosisCandidate> for CandidateRes {
    fn from(c: &DiagnosisCandidate) -> Self {
        Self {
            disease_id: c.disease_id.to_string(),
            disease_name: c.disease_name.clone(),
            percentage: c.percentage,
            common_symptom_names: c.common_symptom_names.clone(),
            missing_symptom_names: c.missing_symptom_names.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRes {
    pub id: String,
    pub patient_id: String,
    pub symptom_ids: Vec<String>,
    pub description: Option<String>,
    pub status: String,
    pub chosen_disease_id: Option<String>,
    pub medical_recommendation_ids: Vec<String>,
    pub free_recommendations: Vec<String>,
    pub diagnostic_candidates: Option<Vec<CandidateRes>>,
    pub doctor_id: Option<String>,
    /// RFC 3339.
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Consultation> for ConsultationRes {
    fn from(c: &Consultation) -> Self {
        Self {
            id: c.id.to_string(),
            patient_id: c.patient_id.to_string(),
            symptom_ids: c.symptom_ids.iter().map(ToString::to_string).collect(),
            description: c.description.clone(),
            status: c.status.as_str().to_string(),
            chosen_disease_id: c.chosen_disease_id.map(|id| id.to_string()),
            medical_recommendation_ids: c
                .medical_recommendation_ids
                .iter()
                .map(ToString::to_string)
                .collect(),
            free_recommendations: c.free_recommendations.clone(),
            diagnostic_candidates: c
                .diagnostic_candidates
                .as_ref()
                .map(|list| list.iter().map(CandidateRes::from).collect()),
            doctor_id: c.doctor_id.map(|id| id.to_string()),
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

/// Created consultation plus its ranked candidates in `data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateConsultationRes {
    pub consultation: ConsultationRes,
    pub data: Vec<CandidateRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CandidateListRes {
    pub data: Vec<CandidateRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingConsultationRes {
    pub id: String,
    pub patient_id: String,
    pub status: String,
    pub created_at: String,
    pub description: Option<String>,
    pub symptom_names: Vec<String>,
    pub candidates: Vec<CandidateRes>,
}

impl From<&ConsultationSummary> for PendingConsultationRes {
    fn from(s: &ConsultationSummary) -> Self {
        Self {
            id: s.id.to_string(),
            patient_id: s.patient_id.to_string(),
            status: s.status.as_str().to_string(),
            created_at: s.created_at.to_rfc3339(),
            description: s.description.clone(),
            symptom_names: s.symptom_names.clone(),
            candidates: s.candidates.iter().map(CandidateRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PendingListRes {
    pub data: Vec<PendingConsultationRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConsultationListRes {
    pub data: Vec<ConsultationRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRes {
    pub id: String,
    pub text: String,
    /// `disease` or `symptom`.
    pub origin: String,
    pub source_symptom_id: Option<String>,
}

impl From<&AggregatedRecommendation> for RecommendationRes {
    fn from(r: &AggregatedRecommendation) -> Self {
        let origin = match r.origin {
            triage_core::RecommendationOrigin::Disease => "disease",
            triage_core::RecommendationOrigin::Symptom => "symptom",
        };
        Self {
            id: r.id.to_string(),
            text: r.text.clone(),
            origin: origin.to_string(),
            source_symptom_id: r.source_symptom_id.map(|id| id.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendationListRes {
    pub data: Vec<RecommendationRes>,
}

/// Error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
