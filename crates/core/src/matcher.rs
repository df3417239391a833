//! Diagnosis matching.
//!
//! Scores every catalog disease against a reported symptom set by plain set intersection:
//!
//! `percentage = 100 * |reported ∩ disease| / |disease|`
//!
//! The denominator is the disease's own profile size, so the score reads as "how much of this
//! disease is explained by what was reported". Reporting extra, unrelated symptoms does not lower
//! it. Diseases sharing no symptom with the report are not candidates at all, and diseases with an
//! empty profile are never scored.
//!
//! Everything here is pure: the caller supplies the diseases and an id→name map built once per
//! request, see [`SymptomNames`].

use crate::consultation::DiagnosisCandidate;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use triage_catalog::{Disease, Symptom};
use triage_types::SymptomId;

/// Symptom id → display name, resolved once per request.
#[derive(Clone, Debug, Default)]
pub struct SymptomNames(HashMap<SymptomId, String>);

impl SymptomNames {
    pub fn from_symptoms<'a>(symptoms: impl IntoIterator<Item = &'a Symptom>) -> Self {
        Self(
            symptoms
                .into_iter()
                .map(|s| (s.id, s.name.as_str().to_owned()))
                .collect(),
        )
    }

    /// The symptom's name, or its id when the catalog no longer knows it.
    pub fn name_of(&self, id: &SymptomId) -> String {
        self.0.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    pub fn names_of<'a>(&self, ids: impl IntoIterator<Item = &'a SymptomId>) -> Vec<String> {
        ids.into_iter().map(|id| self.name_of(id)).collect()
    }
}

/// Every symptom id referenced by the reported set or by any disease profile.
pub fn referenced_symptom_ids<'a>(
    reported: impl IntoIterator<Item = &'a SymptomId>,
    diseases: &[Disease],
) -> BTreeSet<SymptomId> {
    reported
        .into_iter()
        .copied()
        .chain(diseases.iter().flat_map(|d| d.symptom_ids.iter().copied()))
        .collect()
}

/// Scores one disease, or `None` when it is not a candidate.
pub fn score(reported: &BTreeSet<SymptomId>, disease: &Disease) -> Option<f64> {
    let total = disease.symptom_ids.len();
    if total == 0 {
        return None;
    }
    let common = disease.symptom_ids.intersection(reported).count();
    if common == 0 {
        return None;
    }
    Some(100.0 * common as f64 / total as f64)
}

/// Ranks `diseases` against `reported`, best first, keeping at most `top_k`.
///
/// Ordering: percentage descending, then disease name ascending, then disease id, so identical
/// inputs always produce identical output.
pub fn rank_diseases(
    reported: &BTreeSet<SymptomId>,
    diseases: &[Disease],
    names: &SymptomNames,
    top_k: usize,
) -> Vec<DiagnosisCandidate> {
    if reported.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<DiagnosisCandidate> = diseases
        .iter()
        .filter_map(|d| score(reported, d).map(|pct| (d, pct)))
        .map(|(disease, percentage)| {
            let (common, missing): (Vec<&SymptomId>, Vec<&SymptomId>) = disease
                .symptom_ids
                .iter()
                .partition(|id| reported.contains(id));
            DiagnosisCandidate {
                disease_id: disease.id,
                disease_name: disease.name.as_str().to_owned(),
                percentage,
                common_symptom_names: names.names_of(common),
                missing_symptom_names: names.names_of(missing),
            }
        })
        .collect();

    candidates.sort_by(candidate_order);
    candidates.truncate(top_k);
    candidates
}

/// Percentage descending, then disease name, then disease id.
fn candidate_order(a: &DiagnosisCandidate, b: &DiagnosisCandidate) -> Ordering {
    b.percentage
        .total_cmp(&a.percentage)
        .then_with(|| a.disease_name.cmp(&b.disease_name))
        .then_with(|| a.disease_id.cmp(&b.disease_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_types::{DiseaseId, NonEmptyText};

    const FEVER: u128 = 1;
    const COUGH: u128 = 2;
    const RASH: u128 = 3;
    const HEADACHE: u128 = 4;

    fn ids(values: &[u128]) -> BTreeSet<SymptomId> {
        values.iter().map(|v| SymptomId::from_u128(*v)).collect()
    }

    fn disease(n: u128, name: &str, symptoms: &[u128]) -> Disease {
        Disease {
            id: DiseaseId::from_u128(n),
            name: NonEmptyText::new(name).unwrap(),
            symptom_ids: ids(symptoms),
            recommendation_ids: vec![],
        }
    }

    fn names() -> SymptomNames {
        let symptoms: Vec<Symptom> = [
            (FEVER, "Fever"),
            (COUGH, "Cough"),
            (RASH, "Rash"),
            (HEADACHE, "Headache"),
        ]
        .into_iter()
        .map(|(id, name)| Symptom {
            id: SymptomId::from_u128(id),
            name: NonEmptyText::new(name).unwrap(),
            recommendation_ids: vec![],
        })
        .collect();
        SymptomNames::from_symptoms(&symptoms)
    }

    #[test]
    fn fever_and_cough_scenario() {
        let diseases = vec![
            disease(10, "Disease A", &[FEVER, COUGH]),
            disease(11, "Disease B", &[FEVER, COUGH, RASH]),
            disease(12, "Disease C", &[RASH]),
        ];
        let ranked = rank_diseases(&ids(&[FEVER, COUGH]), &diseases, &names(), 15);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].disease_name, "Disease A");
        assert_eq!(ranked[0].percentage, 100.0);
        assert!(ranked[0].missing_symptom_names.is_empty());

        assert_eq!(ranked[1].disease_name, "Disease B");
        assert!((ranked[1].percentage - 66.666).abs() < 0.01);
        assert_eq!(ranked[1].common_symptom_names, vec!["Fever", "Cough"]);
        assert_eq!(ranked[1].missing_symptom_names, vec!["Rash"]);
    }

    #[test]
    fn unrelated_reported_symptoms_do_not_lower_the_score() {
        let diseases = vec![disease(10, "Flu", &[FEVER, COUGH])];
        let ranked = rank_diseases(&ids(&[FEVER, RASH, HEADACHE]), &diseases, &names(), 15);
        assert_eq!(ranked[0].percentage, 50.0);
    }

    #[test]
    fn empty_profiles_and_zero_overlap_are_excluded() {
        let diseases = vec![disease(10, "Empty", &[]), disease(11, "Skin", &[RASH])];
        for reported in [ids(&[FEVER]), ids(&[FEVER, COUGH, HEADACHE]), ids(&[])] {
            assert!(rank_diseases(&reported, &diseases, &names(), 15).is_empty());
        }
    }

    #[test]
    fn percentage_is_bounded_and_full_only_for_subsets() {
        let diseases = vec![
            disease(10, "A", &[FEVER]),
            disease(11, "B", &[FEVER, COUGH]),
            disease(12, "C", &[FEVER, COUGH, RASH, HEADACHE]),
        ];
        let reports = [
            ids(&[FEVER]),
            ids(&[FEVER, COUGH]),
            ids(&[COUGH, RASH]),
            ids(&[FEVER, COUGH, RASH, HEADACHE]),
        ];
        for reported in &reports {
            for d in &diseases {
                if let Some(pct) = score(reported, d) {
                    assert!((0.0..=100.0).contains(&pct));
                    assert_eq!(pct == 100.0, d.symptom_ids.is_subset(reported));
                }
            }
        }
    }

    #[test]
    fn ties_break_by_name_and_output_is_stable() {
        let diseases = vec![
            disease(10, "Zoster", &[FEVER, RASH]),
            disease(11, "Allergy", &[COUGH, RASH]),
            disease(12, "Measles", &[FEVER, COUGH, RASH, HEADACHE]),
        ];
        let reported = ids(&[FEVER, COUGH]);
        let first = rank_diseases(&reported, &diseases, &names(), 15);
        let order: Vec<_> = first.iter().map(|c| c.disease_name.as_str()).collect();
        assert_eq!(order, vec!["Allergy", "Measles", "Zoster"]);

        let second = rank_diseases(&reported, &diseases, &names(), 15);
        assert_eq!(first, second);
        assert!(first
            .windows(2)
            .all(|w| candidate_order(&w[0], &w[1]) != Ordering::Greater));
    }

    #[test]
    fn same_name_ties_break_by_id() {
        let diseases = vec![
            disease(12, "Flu", &[FEVER]),
            disease(10, "Flu", &[FEVER]),
            disease(11, "Flu", &[FEVER]),
        ];
        let ranked = rank_diseases(&ids(&[FEVER]), &diseases, &names(), 2);
        let order: Vec<_> = ranked.iter().map(|c| c.disease_id).collect();
        assert_eq!(order, vec![DiseaseId::from_u128(10), DiseaseId::from_u128(11)]);
    }

    #[test]
    fn truncates_to_top_k() {
        let diseases: Vec<_> = (0..20)
            .map(|n| disease(100 + n, &format!("Disease {n:02}"), &[FEVER]))
            .collect();
        assert_eq!(rank_diseases(&ids(&[FEVER]), &diseases, &names(), 10).len(), 10);
        assert_eq!(rank_diseases(&ids(&[FEVER]), &diseases, &names(), 15).len(), 15);
        assert!(rank_diseases(&ids(&[FEVER]), &diseases, &names(), 0).is_empty());
    }

    #[test]
    fn unknown_symptom_names_fall_back_to_ids() {
        let diseases = vec![disease(10, "Mystery", &[FEVER, 99])];
        let ranked = rank_diseases(&ids(&[FEVER]), &diseases, &names(), 15);
        assert_eq!(
            ranked[0].missing_symptom_names,
            vec![SymptomId::from_u128(99).to_string()]
        );
    }

    #[test]
    fn referenced_ids_cover_report_and_profiles() {
        let diseases = vec![disease(10, "Flu", &[FEVER, COUGH])];
        let referenced = referenced_symptom_ids(&ids(&[HEADACHE]), &diseases);
        assert_eq!(referenced, ids(&[FEVER, COUGH, HEADACHE]));
    }
}
