//! Recommendation aggregation.
//!
//! A consultation's recommendations come from two places: those attached to the chosen disease,
//! and those attached to each reported symptom. They are merged disease-first and de-duplicated
//! by recommendation id, keeping the first occurrence.

use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use triage_catalog::CatalogStore;
use triage_types::{DiseaseId, RecommendationId, SymptomId};

/// Where an aggregated recommendation was reached from. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationOrigin {
    Disease,
    Symptom,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRecommendation {
    pub id: RecommendationId,
    pub text: String,
    pub origin: RecommendationOrigin,
    /// Set when `origin` is [`RecommendationOrigin::Symptom`].
    pub source_symptom_id: Option<SymptomId>,
}

/// Merges the recommendations for `disease_id` and every symptom in `reported`.
///
/// Symptoms are visited in id order. Returns an empty list when nothing is attached.
///
/// # Errors
///
/// Returns [`TriageError::NotFound`] if the disease is not in the catalog, or
/// [`TriageError::Catalog`] if the catalog cannot be read.
pub fn aggregate(
    disease_id: DiseaseId,
    reported: &BTreeSet<SymptomId>,
    catalog: &dyn CatalogStore,
) -> TriageResult<Vec<AggregatedRecommendation>> {
    if catalog.disease(disease_id)?.is_none() {
        return Err(TriageError::NotFound(format!("disease {disease_id}")));
    }

    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for rec in catalog.recommendations_for_disease(disease_id)? {
        if seen.insert(rec.id) {
            merged.push(AggregatedRecommendation {
                id: rec.id,
                text: rec.text.into_string(),
                origin: RecommendationOrigin::Disease,
                source_symptom_id: None,
            });
        }
    }

    for &symptom_id in reported {
        for rec in catalog.recommendations_for_symptom(symptom_id)? {
            if seen.insert(rec.id) {
                merged.push(AggregatedRecommendation {
                    id: rec.id,
                    text: rec.text.into_string(),
                    origin: RecommendationOrigin::Symptom,
                    source_symptom_id: Some(symptom_id),
                });
            }
        }
    }

    Ok(merged)
}
