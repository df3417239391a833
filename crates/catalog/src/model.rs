use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use triage_types::{DiseaseId, NonEmptyText, RecommendationId, SymptomId};

/// A catalog-defined clinical sign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub id: SymptomId,
    pub name: NonEmptyText,
    /// Recommendations surfaced whenever this symptom is reported.
    pub recommendation_ids: Vec<RecommendationId>,
}

/// A catalog disease and the symptom profile it is scored against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disease {
    pub id: DiseaseId,
    pub name: NonEmptyText,
    /// Never empty in well-formed data; an empty profile is never scored.
    pub symptom_ids: BTreeSet<SymptomId>,
    pub recommendation_ids: Vec<RecommendationId>,
}

/// Recommendation text attached to a disease or a symptom.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub text: NonEmptyText,
}
