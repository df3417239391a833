//! Consultation lifecycle.
//!
//! [`ConsultationService`] is the single entry point for creating consultations and moving them
//! through the status machine. It owns no data: the catalog, the repository and the symptom
//! extractor are injected, so every collaborator can be replaced in tests.
//!
//! Every mutation follows the same shape:
//! 1. read the stored record to report missing (`NotFound`) and terminal (`Conflict`) cases
//!    before doing any catalog work
//! 2. validate catalog references (`Validation`)
//! 3. apply the change through [`ConsultationRepository::update`], which re-checks the
//!    transition against the stored state under the repository lock

use crate::config::CoreConfig;
use crate::constants::DEFAULT_EXTRACTOR_TIMEOUT_SECS;
use crate::consultation::{Consultation, ConsultationStatus, DiagnosisCandidate};
use crate::extraction::SymptomExtractor;
use crate::matcher::{rank_diseases, referenced_symptom_ids, SymptomNames};
use crate::pending::{build_pending_view, ConsultationSummary};
use crate::recommendations::{aggregate, AggregatedRecommendation};
use crate::store::ConsultationRepository;
use crate::{TriageError, TriageResult};
use chrono::Utc;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use triage_catalog::CatalogStore;
use triage_types::{ConsultationId, DiseaseId, DoctorId, PatientId, RecommendationId, SymptomId};

/// Input for [`ConsultationService::create`].
#[derive(Clone, Debug, Default)]
pub struct NewConsultation {
    pub patient_id: PatientId,
    /// Symptoms the patient picked explicitly. Must exist in the catalog.
    pub symptom_ids: Vec<SymptomId>,
    /// Free-text complaint, handed to the symptom extractor when present.
    pub description: Option<String>,
}

/// A stored consultation together with the candidates computed for it.
#[derive(Clone, Debug)]
pub struct CreatedConsultation {
    pub consultation: Consultation,
    pub candidates: Vec<DiagnosisCandidate>,
}

/// A doctor's diagnosis for [`ConsultationService::approve`].
#[derive(Clone, Debug)]
pub struct Approval {
    pub disease_id: DiseaseId,
    /// Replaces the stored list when present. When absent the stored list is kept, or seeded
    /// with the aggregated recommendations for the disease and reported symptoms if it is empty.
    pub medical_recommendation_ids: Option<Vec<RecommendationId>>,
    /// Appended to the free-text recommendations, before `notes` and `final_diagnosis`.
    pub free_recommendations: Vec<String>,
    pub notes: Option<String>,
    pub final_diagnosis: Option<String>,
}

impl Approval {
    pub fn for_disease(disease_id: DiseaseId) -> Self {
        Self {
            disease_id,
            medical_recommendation_ids: None,
            free_recommendations: Vec::new(),
            notes: None,
            final_diagnosis: None,
        }
    }

    fn free_text(&self) -> Vec<String> {
        self.free_recommendations
            .iter()
            .chain(self.notes.iter())
            .chain(self.final_diagnosis.iter())
            .cloned()
            .collect()
    }
}

#[derive(Clone)]
pub struct ConsultationService {
    catalog: Arc<dyn CatalogStore>,
    repository: Arc<dyn ConsultationRepository>,
    extractor: Arc<dyn SymptomExtractor>,
    extraction_timeout: Duration,
    diagnosis_top_k: usize,
    pending_top_k: usize,
}

impl ConsultationService {
    pub fn new(
        cfg: &CoreConfig,
        catalog: Arc<dyn CatalogStore>,
        repository: Arc<dyn ConsultationRepository>,
        extractor: Arc<dyn SymptomExtractor>,
    ) -> Self {
        Self {
            catalog,
            repository,
            extractor,
            extraction_timeout: cfg
                .extractor()
                .map(|e| e.timeout)
                .unwrap_or(Duration::from_secs(DEFAULT_EXTRACTOR_TIMEOUT_SECS)),
            diagnosis_top_k: cfg.diagnosis_top_k(),
            pending_top_k: cfg.pending_top_k(),
        }
    }

    /// Creates a `preliminar` consultation and ranks candidates for it.
    ///
    /// Symptoms are the union of the explicit selection and whatever the extractor finds in the
    /// description. Extraction failures never fail creation. When the union is empty the
    /// consultation is still stored, for manual triage, and no candidates are computed.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Validation`] if an explicitly selected symptom is not in the
    /// catalog, and catalog or storage errors otherwise.
    pub async fn create(&self, request: NewConsultation) -> TriageResult<CreatedConsultation> {
        let explicit: BTreeSet<SymptomId> = request.symptom_ids.into_iter().collect();
        self.ensure_symptoms_exist(&explicit)?;

        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let mut symptom_ids = explicit;
        if let Some(text) = &description {
            symptom_ids.extend(self.extract(text).await);
        }

        let mut consultation =
            Consultation::new(request.patient_id, symptom_ids, description, Utc::now());

        let candidates = if consultation.symptom_ids.is_empty() {
            Vec::new()
        } else {
            let ranked = self.rank(&consultation.symptom_ids, self.diagnosis_top_k)?;
            consultation.diagnostic_candidates = Some(ranked.clone());
            ranked
        };

        self.repository.insert(&consultation)?;
        tracing::info!(
            consultation_id = %consultation.id,
            patient_id = %consultation.patient_id,
            symptoms = consultation.symptom_ids.len(),
            candidates = candidates.len(),
            "consultation created"
        );

        Ok(CreatedConsultation {
            consultation,
            candidates,
        })
    }

    pub fn get(&self, id: ConsultationId) -> TriageResult<Consultation> {
        self.repository
            .get(id)?
            .ok_or_else(|| TriageError::NotFound(format!("consultation {id}")))
    }

    /// Recomputes the ranked candidates for a stored consultation.
    pub fn diagnosis(&self, id: ConsultationId) -> TriageResult<Vec<DiagnosisCandidate>> {
        let consultation = self.get(id)?;
        self.rank(&consultation.symptom_ids, self.diagnosis_top_k)
    }

    /// Records a doctor's diagnosis and moves the consultation to `aprovada`.
    ///
    /// Calling it again on an `aprovada` consultation replaces the chosen disease, and the medical
    /// recommendations only when new ones are given. Free-text recommendations from every call
    /// accumulate.
    ///
    /// # Errors
    ///
    /// - [`TriageError::NotFound`] if the consultation does not exist
    /// - [`TriageError::Conflict`] if it is `cancelada` or `realizada`
    /// - [`TriageError::Validation`] if the disease or any recommendation is not in the catalog
    pub fn approve(
        &self,
        id: ConsultationId,
        doctor_id: DoctorId,
        approval: Approval,
    ) -> TriageResult<Consultation> {
        let current = self.get(id)?;
        current.ensure_can_transition(ConsultationStatus::Aprovada)?;

        if self.catalog.disease(approval.disease_id)?.is_none() {
            return Err(TriageError::Validation(format!(
                "unknown disease {}",
                approval.disease_id
            )));
        }

        let explicit_ids = approval
            .medical_recommendation_ids
            .as_deref()
            .map(|ids| self.validated_recommendations(ids))
            .transpose()?;
        let aggregated_ids: Vec<RecommendationId> = match explicit_ids {
            Some(_) => Vec::new(),
            None => aggregate(approval.disease_id, &current.symptom_ids, self.catalog.as_ref())?
                .into_iter()
                .map(|r| r.id)
                .collect(),
        };
        let free_text = approval.free_text();

        let updated = self.repository.update(id, &mut |rec| {
            rec.transition(ConsultationStatus::Aprovada, Utc::now())?;
            rec.chosen_disease_id = Some(approval.disease_id);
            match &explicit_ids {
                Some(ids) => rec.medical_recommendation_ids = ids.clone(),
                None if rec.medical_recommendation_ids.is_empty() => {
                    rec.medical_recommendation_ids = aggregated_ids.clone()
                }
                None => {}
            }
            rec.append_free_recommendations(&free_text);
            rec.doctor_id = Some(doctor_id);
            Ok(())
        })?;

        tracing::info!(
            consultation_id = %id,
            doctor_id = %doctor_id,
            disease_id = %approval.disease_id,
            "consultation approved"
        );
        Ok(updated)
    }

    pub fn cancel(&self, id: ConsultationId, doctor_id: DoctorId) -> TriageResult<Consultation> {
        self.move_to(id, doctor_id, ConsultationStatus::Cancelada)
    }

    pub fn mark_as_done(
        &self,
        id: ConsultationId,
        doctor_id: DoctorId,
    ) -> TriageResult<Consultation> {
        self.move_to(id, doctor_id, ConsultationStatus::Realizada)
    }

    /// Aggregated recommendations for the chosen disease and the reported symptoms.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::NotFound`] if the consultation does not exist or has no disease
    /// chosen yet.
    pub fn recommendations(&self, id: ConsultationId) -> TriageResult<Vec<AggregatedRecommendation>> {
        let consultation = self.get(id)?;
        let disease_id = consultation.chosen_disease_id.ok_or_else(|| {
            TriageError::NotFound(format!("consultation {id} has no diagnosis yet"))
        })?;
        aggregate(disease_id, &consultation.symptom_ids, self.catalog.as_ref())
    }

    /// Worklist of every `preliminar` consultation.
    pub fn pending(&self) -> TriageResult<Vec<ConsultationSummary>> {
        let open: Vec<Consultation> = self
            .repository
            .list()?
            .into_iter()
            .filter(|c| c.status == ConsultationStatus::Preliminar)
            .collect();
        build_pending_view(&open, self.catalog.as_ref(), self.pending_top_k)
    }

    /// Consultations whose status is in `statuses`; an empty filter matches everything.
    pub fn reports(&self, statuses: &BTreeSet<ConsultationStatus>) -> TriageResult<Vec<Consultation>> {
        Ok(self
            .repository
            .list()?
            .into_iter()
            .filter(|c| statuses.is_empty() || statuses.contains(&c.status))
            .collect())
    }

    fn move_to(
        &self,
        id: ConsultationId,
        doctor_id: DoctorId,
        target: ConsultationStatus,
    ) -> TriageResult<Consultation> {
        let updated = self
            .repository
            .update(id, &mut |rec| rec.transition(target, Utc::now()))?;
        tracing::info!(
            consultation_id = %id,
            doctor_id = %doctor_id,
            status = %target,
            "consultation status changed"
        );
        Ok(updated)
    }

    fn rank(
        &self,
        reported: &BTreeSet<SymptomId>,
        top_k: usize,
    ) -> TriageResult<Vec<DiagnosisCandidate>> {
        if reported.is_empty() {
            return Ok(Vec::new());
        }
        let diseases = self.catalog.diseases()?;
        let referenced = referenced_symptom_ids(reported, &diseases);
        let names = SymptomNames::from_symptoms(&self.catalog.symptoms_by_ids(&referenced)?);
        Ok(rank_diseases(reported, &diseases, &names, top_k))
    }

    fn ensure_symptoms_exist(&self, ids: &BTreeSet<SymptomId>) -> TriageResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let known: HashSet<SymptomId> = self
            .catalog
            .symptoms_by_ids(ids)?
            .into_iter()
            .map(|s| s.id)
            .collect();
        match ids.iter().find(|id| !known.contains(id)) {
            Some(unknown) => Err(TriageError::Validation(format!("unknown symptom {unknown}"))),
            None => Ok(()),
        }
    }

    /// De-duplicates `ids` (first occurrence wins) and checks every one exists.
    fn validated_recommendations(
        &self,
        ids: &[RecommendationId],
    ) -> TriageResult<Vec<RecommendationId>> {
        let mut seen = HashSet::new();
        let unique: Vec<RecommendationId> =
            ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let known: HashSet<RecommendationId> = self
            .catalog
            .recommendations_by_ids(&unique)?
            .into_iter()
            .map(|r| r.id)
            .collect();
        match unique.iter().find(|id| !known.contains(id)) {
            Some(unknown) => Err(TriageError::Validation(format!(
                "unknown recommendation {unknown}"
            ))),
            None => Ok(unique),
        }
    }

    /// Runs the extractor under the timeout. Any failure degrades to no symptoms.
    async fn extract(&self, text: &str) -> Vec<SymptomId> {
        let symptoms = match self.catalog.symptoms() {
            Ok(symptoms) => symptoms,
            Err(e) => {
                tracing::warn!(error = %e, "symptom extraction skipped: catalog unavailable");
                return Vec::new();
            }
        };

        let outcome = tokio::time::timeout(
            self.extraction_timeout,
            self.extractor.extract_symptom_ids(text, &symptoms),
        )
        .await;

        let extracted = match outcome {
            Ok(Ok(ids)) => ids,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "symptom extraction failed; continuing without it");
                return Vec::new();
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.extraction_timeout.as_secs(),
                    "symptom extraction timed out; continuing without it"
                );
                return Vec::new();
            }
        };

        let known: HashSet<SymptomId> = symptoms.iter().map(|s| s.id).collect();
        let (kept, dropped): (Vec<_>, Vec<_>) =
            extracted.into_iter().partition(|id| known.contains(id));
        if !dropped.is_empty() {
            tracing::warn!(dropped = dropped.len(), "extractor returned unknown symptom ids");
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{DisabledExtractor, ExtractionFuture};
    use crate::store::InMemoryConsultationRepository;
    use std::path::PathBuf;
    use triage_catalog::{Catalog, Disease, Recommendation, Symptom};
    use triage_types::NonEmptyText;

    const FEVER: u128 = 1;
    const COUGH: u128 = 2;
    const RASH: u128 = 3;

    const DISEASE_A: u128 = 100;
    const DISEASE_B: u128 = 101;
    const DISEASE_C: u128 = 102;

    const REC_REST: u128 = 200;
    const REC_FLUIDS: u128 = 201;

    fn catalog() -> Catalog {
        let symptom = |n: u128, name: &str, recs: &[u128]| Symptom {
            id: SymptomId::from_u128(n),
            name: NonEmptyText::new(name).unwrap(),
            recommendation_ids: recs.iter().map(|r| RecommendationId::from_u128(*r)).collect(),
        };
        let disease = |n: u128, name: &str, symptoms: &[u128], recs: &[u128]| Disease {
            id: DiseaseId::from_u128(n),
            name: NonEmptyText::new(name).unwrap(),
            symptom_ids: symptoms.iter().map(|s| SymptomId::from_u128(*s)).collect(),
            recommendation_ids: recs.iter().map(|r| RecommendationId::from_u128(*r)).collect(),
        };
        let rec = |n: u128, text: &str| Recommendation {
            id: RecommendationId::from_u128(n),
            text: NonEmptyText::new(text).unwrap(),
        };

        Catalog::new(
            vec![
                symptom(FEVER, "Fever", &[REC_FLUIDS]),
                symptom(COUGH, "Cough", &[]),
                symptom(RASH, "Rash", &[]),
            ],
            vec![
                disease(DISEASE_A, "Disease A", &[FEVER, COUGH], &[REC_REST]),
                disease(DISEASE_B, "Disease B", &[FEVER, COUGH, RASH], &[]),
                disease(DISEASE_C, "Disease C", &[RASH], &[]),
            ],
            vec![rec(REC_REST, "Rest"), rec(REC_FLUIDS, "Drink fluids")],
        )
        .unwrap()
    }

    fn service_with(extractor: Arc<dyn SymptomExtractor>) -> ConsultationService {
        let cfg = CoreConfig::new(PathBuf::from("catalog.yaml"), None);
        ConsultationService::new(
            &cfg,
            Arc::new(catalog()),
            Arc::new(InMemoryConsultationRepository::new()),
            extractor,
        )
    }

    fn service() -> ConsultationService {
        service_with(Arc::new(DisabledExtractor))
    }

    fn symptoms(values: &[u128]) -> Vec<SymptomId> {
        values.iter().map(|v| SymptomId::from_u128(*v)).collect()
    }

    async fn create(svc: &ConsultationService, values: &[u128]) -> Consultation {
        svc.create(NewConsultation {
            patient_id: PatientId::new(),
            symptom_ids: symptoms(values),
            description: None,
        })
        .await
        .unwrap()
        .consultation
    }

    /// Returns a fixed answer, or fails, or never answers.
    enum StubExtractor {
        Returns(Vec<SymptomId>),
        Fails,
        Hangs,
    }

    impl SymptomExtractor for StubExtractor {
        fn extract_symptom_ids<'a>(
            &'a self,
            _text: &'a str,
            _symptoms: &'a [Symptom],
        ) -> ExtractionFuture<'a> {
            Box::pin(async move {
                match self {
                    StubExtractor::Returns(ids) => Ok(ids.clone()),
                    StubExtractor::Fails => Err(TriageError::Upstream("model offline".into())),
                    StubExtractor::Hangs => {
                        std::future::pending::<()>().await;
                        Ok(Vec::new())
                    }
                }
            })
        }
    }

    #[tokio::test]
    async fn create_ranks_and_caches_candidates() {
        let svc = service();
        let created = svc
            .create(NewConsultation {
                patient_id: PatientId::new(),
                symptom_ids: symptoms(&[FEVER, COUGH]),
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(created.consultation.status, ConsultationStatus::Preliminar);
        let names: Vec<_> = created
            .candidates
            .iter()
            .map(|c| c.disease_name.as_str())
            .collect();
        assert_eq!(names, vec!["Disease A", "Disease B"]);
        assert_eq!(
            created.consultation.diagnostic_candidates.as_ref(),
            Some(&created.candidates)
        );

        let stored = svc.get(created.consultation.id).unwrap();
        assert_eq!(stored, created.consultation);
    }

    #[tokio::test]
    async fn empty_creation_is_stored_without_candidates() {
        let svc = service();
        let created = svc.create(NewConsultation::default()).await.unwrap();

        assert_eq!(created.consultation.status, ConsultationStatus::Preliminar);
        assert!(created.candidates.is_empty());
        assert!(created.consultation.diagnostic_candidates.is_none());
        assert!(svc.get(created.consultation.id).is_ok());
    }

    #[tokio::test]
    async fn unknown_explicit_symptom_is_rejected() {
        let svc = service();
        let err = svc
            .create(NewConsultation {
                patient_id: PatientId::new(),
                symptom_ids: symptoms(&[FEVER, 999]),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
        assert!(svc.reports(&BTreeSet::new()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn extracted_symptoms_merge_with_explicit_ones() {
        let svc = service_with(Arc::new(StubExtractor::Returns(symptoms(&[COUGH, 999]))));
        let created = svc
            .create(NewConsultation {
                patient_id: PatientId::new(),
                symptom_ids: symptoms(&[FEVER]),
                description: Some("hot and coughing".into()),
            })
            .await
            .unwrap();

        assert_eq!(
            created.consultation.symptom_ids,
            symptoms(&[FEVER, COUGH]).into_iter().collect()
        );
        assert_eq!(created.candidates[0].percentage, 100.0);
    }

    #[tokio::test]
    async fn extractor_failure_degrades_to_explicit_symptoms() {
        let svc = service_with(Arc::new(StubExtractor::Fails));
        let created = svc
            .create(NewConsultation {
                patient_id: PatientId::new(),
                symptom_ids: symptoms(&[RASH]),
                description: Some("itchy".into()),
            })
            .await
            .unwrap();
        assert_eq!(created.consultation.symptom_ids.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn extractor_timeout_degrades_to_no_symptoms() {
        let svc = service_with(Arc::new(StubExtractor::Hangs));
        let created = svc
            .create(NewConsultation {
                patient_id: PatientId::new(),
                symptom_ids: vec![],
                description: Some("I do not feel well".into()),
            })
            .await
            .unwrap();
        assert!(created.consultation.symptom_ids.is_empty());
        assert!(created.candidates.is_empty());
        assert_eq!(
            created.consultation.description.as_deref(),
            Some("I do not feel well")
        );
    }

    #[tokio::test]
    async fn approve_sets_diagnosis_and_aggregated_recommendations() {
        let svc = service();
        let c = create(&svc, &[FEVER, COUGH]).await;
        let doctor = DoctorId::new();

        let approved = svc
            .approve(c.id, doctor, Approval::for_disease(DiseaseId::from_u128(DISEASE_A)))
            .unwrap();

        assert_eq!(approved.status, ConsultationStatus::Aprovada);
        assert_eq!(approved.chosen_disease_id, Some(DiseaseId::from_u128(DISEASE_A)));
        assert_eq!(approved.doctor_id, Some(doctor));
        assert_eq!(
            approved.medical_recommendation_ids,
            vec![
                RecommendationId::from_u128(REC_REST),
                RecommendationId::from_u128(REC_FLUIDS)
            ]
        );
        assert_eq!(approved.created_at, c.created_at);
        assert_eq!(approved.symptom_ids, c.symptom_ids);
    }

    #[tokio::test]
    async fn approve_with_unknown_disease_leaves_record_unchanged() {
        let svc = service();
        let c = create(&svc, &[FEVER]).await;

        let err = svc
            .approve(c.id, DoctorId::new(), Approval::for_disease(DiseaseId::from_u128(999)))
            .unwrap_err();

        assert!(matches!(err, TriageError::Validation(_)));
        assert_eq!(svc.get(c.id).unwrap(), c);
    }

    #[tokio::test]
    async fn approve_with_unknown_recommendation_is_rejected() {
        let svc = service();
        let c = create(&svc, &[FEVER]).await;
        let mut approval = Approval::for_disease(DiseaseId::from_u128(DISEASE_A));
        approval.medical_recommendation_ids = Some(vec![
            RecommendationId::from_u128(REC_REST),
            RecommendationId::from_u128(999),
        ]);
        approval.notes = Some("should not be stored".into());

        let err = svc.approve(c.id, DoctorId::new(), approval).unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
        assert_eq!(svc.get(c.id).unwrap(), c);
    }

    #[tokio::test]
    async fn second_approval_wins_and_free_text_accumulates() {
        let svc = service();
        let c = create(&svc, &[FEVER, COUGH]).await;

        let mut first = Approval::for_disease(DiseaseId::from_u128(DISEASE_A));
        first.notes = Some("Rest for three days".into());
        first.medical_recommendation_ids = Some(vec![
            RecommendationId::from_u128(REC_FLUIDS),
            RecommendationId::from_u128(REC_FLUIDS),
        ]);
        svc.approve(c.id, DoctorId::new(), first).unwrap();

        let mut second = Approval::for_disease(DiseaseId::from_u128(DISEASE_B));
        second.free_recommendations = vec!["Rest for three days".into()];
        second.final_diagnosis = Some("Viral infection".into());
        second.medical_recommendation_ids = Some(vec![RecommendationId::from_u128(REC_REST)]);
        let approved = svc.approve(c.id, DoctorId::new(), second).unwrap();

        assert_eq!(approved.chosen_disease_id, Some(DiseaseId::from_u128(DISEASE_B)));
        assert_eq!(
            approved.free_recommendations,
            vec!["Rest for three days", "Viral infection"]
        );
        assert_eq!(
            approved.medical_recommendation_ids,
            vec![RecommendationId::from_u128(REC_REST)]
        );
    }

    #[tokio::test]
    async fn note_only_reapproval_keeps_chosen_recommendations() {
        let svc = service();
        let c = create(&svc, &[FEVER, COUGH]).await;

        let mut first = Approval::for_disease(DiseaseId::from_u128(DISEASE_A));
        first.medical_recommendation_ids = Some(vec![RecommendationId::from_u128(REC_REST)]);
        svc.approve(c.id, DoctorId::new(), first).unwrap();

        let mut second = Approval::for_disease(DiseaseId::from_u128(DISEASE_A));
        second.notes = Some("Follow up next week".into());
        let approved = svc.approve(c.id, DoctorId::new(), second).unwrap();

        assert_eq!(
            approved.medical_recommendation_ids,
            vec![RecommendationId::from_u128(REC_REST)]
        );
        assert_eq!(approved.free_recommendations, vec!["Follow up next week"]);
    }

    #[tokio::test]
    async fn terminal_states_reject_every_mutation() {
        let svc = service();
        for finish in [ConsultationStatus::Cancelada, ConsultationStatus::Realizada] {
            let c = create(&svc, &[FEVER]).await;
            let doctor = DoctorId::new();
            match finish {
                ConsultationStatus::Cancelada => svc.cancel(c.id, doctor).unwrap(),
                _ => svc.mark_as_done(c.id, doctor).unwrap(),
            };

            let approve =
                svc.approve(c.id, doctor, Approval::for_disease(DiseaseId::from_u128(DISEASE_A)));
            assert!(matches!(approve, Err(TriageError::Conflict(_))));
            assert!(matches!(svc.cancel(c.id, doctor), Err(TriageError::Conflict(_))));
            assert!(matches!(
                svc.mark_as_done(c.id, doctor),
                Err(TriageError::Conflict(_))
            ));
            assert_eq!(svc.get(c.id).unwrap().status, finish);
        }
    }

    #[tokio::test]
    async fn terminal_conflict_takes_precedence_over_bad_input() {
        let svc = service();
        let c = create(&svc, &[FEVER]).await;
        svc.cancel(c.id, DoctorId::new()).unwrap();
        let err = svc
            .approve(c.id, DoctorId::new(), Approval::for_disease(DiseaseId::from_u128(999)))
            .unwrap_err();
        assert!(matches!(err, TriageError::Conflict(_)));
    }

    #[tokio::test]
    async fn approved_consultation_can_be_completed() {
        let svc = service();
        let c = create(&svc, &[FEVER]).await;
        let doctor = DoctorId::new();
        svc.approve(c.id, doctor, Approval::for_disease(DiseaseId::from_u128(DISEASE_A)))
            .unwrap();
        let done = svc.mark_as_done(c.id, doctor).unwrap();
        assert_eq!(done.status, ConsultationStatus::Realizada);
        assert_eq!(done.chosen_disease_id, Some(DiseaseId::from_u128(DISEASE_A)));
    }

    #[tokio::test]
    async fn unknown_consultation_is_not_found() {
        let svc = service();
        let id = ConsultationId::new();
        assert!(matches!(svc.get(id), Err(TriageError::NotFound(_))));
        assert!(matches!(
            svc.cancel(id, DoctorId::new()),
            Err(TriageError::NotFound(_))
        ));
        assert!(matches!(
            svc.approve(id, DoctorId::new(), Approval::for_disease(DiseaseId::from_u128(DISEASE_A))),
            Err(TriageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn recommendations_require_a_diagnosis() {
        let svc = service();
        let c = create(&svc, &[FEVER, COUGH]).await;
        assert!(matches!(
            svc.recommendations(c.id),
            Err(TriageError::NotFound(_))
        ));

        svc.approve(c.id, DoctorId::new(), Approval::for_disease(DiseaseId::from_u128(DISEASE_A)))
            .unwrap();
        let recs = svc.recommendations(c.id).unwrap();
        let texts: Vec<_> = recs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Rest", "Drink fluids"]);
    }

    #[tokio::test]
    async fn pending_lists_only_preliminar() {
        let svc = service();
        let open = create(&svc, &[FEVER, COUGH]).await;
        let cancelled = create(&svc, &[RASH]).await;
        svc.cancel(cancelled.id, DoctorId::new()).unwrap();

        let pending = svc.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, open.id);
        assert_eq!(pending[0].symptom_names, vec!["Fever", "Cough"]);
        assert_eq!(pending[0].candidates[0].disease_name, "Disease A");
    }

    #[tokio::test]
    async fn reports_filter_by_status() {
        let svc = service();
        let open = create(&svc, &[FEVER]).await;
        let done = create(&svc, &[COUGH]).await;
        svc.mark_as_done(done.id, DoctorId::new()).unwrap();

        let only_done: BTreeSet<_> = [ConsultationStatus::Realizada].into_iter().collect();
        let listed = svc.reports(&only_done).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, done.id);

        let everything = svc.reports(&BTreeSet::new()).unwrap();
        assert_eq!(everything.len(), 2);
        assert!(everything.iter().any(|c| c.id == open.id));
    }

    #[tokio::test]
    async fn diagnosis_is_recomputed_from_stored_symptoms() {
        let svc = service();
        let c = create(&svc, &[RASH]).await;
        let candidates = svc.diagnosis(c.id).unwrap();
        let names: Vec<_> = candidates.iter().map(|c| c.disease_name.as_str()).collect();
        assert_eq!(names, vec!["Disease C", "Disease B"]);
    }
}
