use crate::{CatalogError, CatalogResult, Disease, Recommendation, Symptom};
use std::collections::{BTreeMap, BTreeSet};
use triage_types::{DiseaseId, RecommendationId, SymptomId};

/// Read-only access to catalog data.
///
/// The engine only ever reads through this trait, so the backing store can be swapped (remote
/// service, database, fixture) without touching scoring or lifecycle code. Lookups by id silently
/// skip ids the store does not know; callers that need to reject unknown ids compare the result
/// against what they asked for.
pub trait CatalogStore: Send + Sync {
    /// All symptoms, ordered by id.
    fn symptoms(&self) -> CatalogResult<Vec<Symptom>>;

    /// The symptoms whose ids appear in `ids`, ordered by id.
    fn symptoms_by_ids(&self, ids: &BTreeSet<SymptomId>) -> CatalogResult<Vec<Symptom>>;

    /// All diseases with their symptom sets, ordered by id.
    fn diseases(&self) -> CatalogResult<Vec<Disease>>;

    fn disease(&self, id: DiseaseId) -> CatalogResult<Option<Disease>>;

    /// The recommendations whose ids appear in `ids`, in the order requested.
    fn recommendations_by_ids(&self, ids: &[RecommendationId])
        -> CatalogResult<Vec<Recommendation>>;

    /// Recommendations attached to a disease, in attachment order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidInput`] if the disease does not exist.
    fn recommendations_for_disease(&self, id: DiseaseId) -> CatalogResult<Vec<Recommendation>>;

    /// Recommendations attached to a symptom, in attachment order. Unknown symptoms have none.
    fn recommendations_for_symptom(&self, id: SymptomId) -> CatalogResult<Vec<Recommendation>>;
}

/// Immutable in-memory catalog.
///
/// Construction validates the whole data set: ids are unique per kind and every symptom and
/// recommendation reference resolves. Once built, every read is infallible.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    symptoms: BTreeMap<SymptomId, Symptom>,
    diseases: BTreeMap<DiseaseId, Disease>,
    recommendations: BTreeMap<RecommendationId, Recommendation>,
}

impl Catalog {
    /// Builds a validated catalog.
    ///
    /// Diseases with an empty symptom set are kept (they may still carry recommendations) but
    /// logged, since they can never be scored.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateId`] if an id appears twice within a kind, or
    /// [`CatalogError::UnknownReference`] if a disease or symptom points at an id that does not
    /// exist.
    pub fn new(
        symptoms: Vec<Symptom>,
        diseases: Vec<Disease>,
        recommendations: Vec<Recommendation>,
    ) -> CatalogResult<Self> {
        let mut catalog = Catalog::default();

        for rec in recommendations {
            let id = rec.id;
            if catalog.recommendations.insert(id, rec).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "recommendation",
                    id: id.to_string(),
                });
            }
        }

        for symptom in symptoms {
            catalog.check_recommendations(
                &format!("symptom '{}'", symptom.name),
                &symptom.recommendation_ids,
            )?;
            let id = symptom.id;
            if catalog.symptoms.insert(id, symptom).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "symptom",
                    id: id.to_string(),
                });
            }
        }

        for disease in diseases {
            let owner = format!("disease '{}'", disease.name);
            catalog.check_recommendations(&owner, &disease.recommendation_ids)?;
            if let Some(missing) = disease
                .symptom_ids
                .iter()
                .find(|id| !catalog.symptoms.contains_key(id))
            {
                return Err(CatalogError::UnknownReference {
                    owner,
                    kind: "symptom",
                    id: missing.to_string(),
                });
            }
            if disease.symptom_ids.is_empty() {
                tracing::warn!(
                    disease_id = %disease.id,
                    name = %disease.name,
                    "disease has no symptoms and will never be scored"
                );
            }
            let id = disease.id;
            if catalog.diseases.insert(id, disease).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "disease",
                    id: id.to_string(),
                });
            }
        }

        Ok(catalog)
    }

    pub fn symptom_count(&self) -> usize {
        self.symptoms.len()
    }

    pub fn disease_count(&self) -> usize {
        self.diseases.len()
    }

    pub fn recommendation_count(&self) -> usize {
        self.recommendations.len()
    }

    fn check_recommendations(&self, owner: &str, ids: &[RecommendationId]) -> CatalogResult<()> {
        match ids.iter().find(|id| !self.recommendations.contains_key(id)) {
            Some(missing) => Err(CatalogError::UnknownReference {
                owner: owner.to_owned(),
                kind: "recommendation",
                id: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn resolve(&self, ids: &[RecommendationId]) -> Vec<Recommendation> {
        ids.iter()
            .filter_map(|id| self.recommendations.get(id).cloned())
            .collect()
    }
}

impl CatalogStore for Catalog {
    fn symptoms(&self) -> CatalogResult<Vec<Symptom>> {
        Ok(self.symptoms.values().cloned().collect())
    }

    fn symptoms_by_ids(&self, ids: &BTreeSet<SymptomId>) -> CatalogResult<Vec<Symptom>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.symptoms.get(id).cloned())
            .collect())
    }

    fn diseases(&self) -> CatalogResult<Vec<Disease>> {
        Ok(self.diseases.values().cloned().collect())
    }

    fn disease(&self, id: DiseaseId) -> CatalogResult<Option<Disease>> {
        Ok(self.diseases.get(&id).cloned())
    }

    fn recommendations_by_ids(
        &self,
        ids: &[RecommendationId],
    ) -> CatalogResult<Vec<Recommendation>> {
        Ok(self.resolve(ids))
    }

    fn recommendations_for_disease(&self, id: DiseaseId) -> CatalogResult<Vec<Recommendation>> {
        let disease = self
            .diseases
            .get(&id)
            .ok_or_else(|| CatalogError::InvalidInput(format!("unknown disease {id}")))?;
        Ok(self.resolve(&disease.recommendation_ids))
    }

    fn recommendations_for_symptom(&self, id: SymptomId) -> CatalogResult<Vec<Recommendation>> {
        Ok(self
            .symptoms
            .get(&id)
            .map(|s| self.resolve(&s.recommendation_ids))
            .unwrap_or_default())
    }
}
