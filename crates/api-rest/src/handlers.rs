//! Consultation endpoints.
//!
//! Handlers stay thin: parse ids, check the caller's role, call [`ConsultationService`] and map
//! the result onto the wire types in `api_shared::dto`.

use crate::actor::CurrentActor;
use crate::error::ApiError;
use crate::AppState;
use api_shared::dto::{
    ApproveReq, CandidateListRes, CandidateRes, ConsultationListRes, ConsultationRes,
    CreateConsultationReq, CreateConsultationRes, ErrorBody, PendingConsultationRes,
    PendingListRes, RecommendationListRes, RecommendationRes, ReportsQuery,
};
use api_shared::{Actor, HealthRes, HealthService};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use triage_core::{Approval, Consultation, ConsultationStatus, NewConsultation};
use triage_types::{ConsultationId, DiseaseId, PatientId, RecommendationId, SymptomId};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness probe. Does not touch the catalog or the store.
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/consultas",
    request_body = CreateConsultationReq,
    params(
        ("x-actor-id" = String, Header, description = "Caller id (32 lowercase hex)"),
        ("x-actor-role" = String, Header, description = "`patient` or `doctor`")
    ),
    responses(
        (status = 200, description = "Consultation created; candidates in `data`", body = CreateConsultationRes),
        (status = 400, description = "Malformed body or unknown symptom id", body = ErrorBody),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorBody),
        (status = 403, description = "Caller may not file for this patient", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
/// Open a consultation
///
/// Stores a `preliminar` consultation from the selected symptoms and, when a description is
/// given, any symptoms extracted from it. Returns the ranked diagnosis candidates in `data`,
/// which is empty when no symptom could be resolved.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the body is not valid JSON,
/// - a symptom id is malformed or not in the catalog.
#[axum::debug_handler(state = AppState)]
pub async fn create_consultation(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<CreateConsultationReq>, JsonRejection>,
) -> Result<Json<CreateConsultationRes>, ApiError> {
    let Json(req) = body?;

    let requested_patient = req
        .patient_id
        .as_deref()
        .map(PatientId::parse)
        .transpose()?;
    let patient_id = actor.consultation_owner(requested_patient)?;
    let symptom_ids = req
        .symptom_ids
        .iter()
        .map(|s| SymptomId::parse(s))
        .collect::<Result<Vec<_>, _>>()?;

    let created = state
        .service
        .create(NewConsultation {
            patient_id,
            symptom_ids,
            description: req.description,
        })
        .await
        .inspect_err(|e| log_failure("create consultation", e))?;

    Ok(Json(CreateConsultationRes {
        consultation: ConsultationRes::from(&created.consultation),
        data: created.candidates.iter().map(CandidateRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/consultas/pending",
    params(
        ("x-actor-id" = String, Header, description = "Doctor id"),
        ("x-actor-role" = String, Header, description = "Must be `doctor`")
    ),
    responses(
        (status = 200, description = "Open consultations, oldest first", body = PendingListRes),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorBody),
        (status = 403, description = "Caller is not a doctor", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
/// Doctor worklist
///
/// Every `preliminar` consultation with its reported symptom names and top candidates.
#[axum::debug_handler(state = AppState)]
pub async fn pending(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<PendingListRes>, ApiError> {
    actor.require_doctor()?;
    let summaries = state
        .service
        .pending()
        .inspect_err(|e| log_failure("build pending view", e))?;
    Ok(Json(PendingListRes {
        data: summaries.iter().map(PendingConsultationRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/consultas/reports",
    params(
        ReportsQuery,
        ("x-actor-id" = String, Header, description = "Doctor id"),
        ("x-actor-role" = String, Header, description = "Must be `doctor`")
    ),
    responses(
        (status = 200, description = "Consultations matching the status filter", body = ConsultationListRes),
        (status = 400, description = "Unknown status in filter", body = ErrorBody),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorBody),
        (status = 403, description = "Caller is not a doctor", body = ErrorBody)
    )
)]
/// List consultations by status
#[axum::debug_handler(state = AppState)]
pub async fn reports(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    query: Result<Query<ReportsQuery>, QueryRejection>,
) -> Result<Json<ConsultationListRes>, ApiError> {
    actor.require_doctor()?;
    let Query(query) = query?;
    let statuses = ConsultationStatus::parse_filter(query.status.as_deref().unwrap_or(""))?;
    let listed = state
        .service
        .reports(&statuses)
        .inspect_err(|e| log_failure("list consultations", e))?;
    Ok(Json(ConsultationListRes {
        data: listed.iter().map(ConsultationRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/consultas/{id}",
    params(
        ("id" = String, Path, description = "Consultation id"),
        ("x-actor-id" = String, Header, description = "Caller id"),
        ("x-actor-role" = String, Header, description = "`patient` or `doctor`")
    ),
    responses(
        (status = 200, description = "The consultation", body = ConsultationRes),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 403, description = "Consultation belongs to another patient", body = ErrorBody),
        (status = 404, description = "No such consultation", body = ErrorBody)
    )
)]
/// Read one consultation
#[axum::debug_handler(state = AppState)]
pub async fn get_consultation(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<ConsultationRes>, ApiError> {
    let consultation = visible_consultation(&state, &actor, &id)?;
    Ok(Json(ConsultationRes::from(&consultation)))
}

#[utoipa::path(
    get,
    path = "/consultas/{id}/diagnosis",
    params(
        ("id" = String, Path, description = "Consultation id"),
        ("x-actor-id" = String, Header, description = "Caller id"),
        ("x-actor-role" = String, Header, description = "`patient` or `doctor`")
    ),
    responses(
        (status = 200, description = "Ranked candidates, recomputed from the catalog", body = CandidateListRes),
        (status = 403, description = "Consultation belongs to another patient", body = ErrorBody),
        (status = 404, description = "No such consultation", body = ErrorBody)
    )
)]
/// Recompute diagnosis candidates
#[axum::debug_handler(state = AppState)]
pub async fn diagnosis(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<CandidateListRes>, ApiError> {
    let consultation = visible_consultation(&state, &actor, &id)?;
    let candidates = state
        .service
        .diagnosis(consultation.id)
        .inspect_err(|e| log_failure("rank diagnosis", e))?;
    Ok(Json(CandidateListRes {
        data: candidates.iter().map(CandidateRes::from).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/consultas/{id}/approve",
    request_body = ApproveReq,
    params(
        ("id" = String, Path, description = "Consultation id"),
        ("x-actor-id" = String, Header, description = "Doctor id"),
        ("x-actor-role" = String, Header, description = "Must be `doctor`")
    ),
    responses(
        (status = 200, description = "Consultation approved", body = ConsultationRes),
        (status = 400, description = "Missing or unknown `doenca`, or unknown recommendation", body = ErrorBody),
        (status = 403, description = "Caller is not a doctor", body = ErrorBody),
        (status = 404, description = "No such consultation", body = ErrorBody),
        (status = 409, description = "Consultation is cancelled or done", body = ErrorBody)
    )
)]
/// Approve a diagnosis
///
/// Records the chosen disease and recommendations and moves the consultation to `aprovada`.
/// Approving an already approved consultation replaces the diagnosis; free-text notes from both
/// approvals are kept. Also served at `/consultas/{id}/validate-diagnosis`.
#[axum::debug_handler(state = AppState)]
pub async fn approve(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Result<Json<ApproveReq>, JsonRejection>,
) -> Result<Json<ConsultationRes>, ApiError> {
    let doctor_id = actor.require_doctor()?;
    let id = ConsultationId::parse(&id)?;
    let Json(req) = body?;
    let approval = approval_from_request(req)?;

    let approved = state
        .service
        .approve(id, doctor_id, approval)
        .inspect_err(|e| log_failure("approve consultation", e))?;
    Ok(Json(ConsultationRes::from(&approved)))
}

#[utoipa::path(
    put,
    path = "/consultas/{id}/validate-diagnosis",
    request_body = ApproveReq,
    params(
        ("id" = String, Path, description = "Consultation id"),
        ("x-actor-id" = String, Header, description = "Doctor id"),
        ("x-actor-role" = String, Header, description = "Must be `doctor`")
    ),
    responses(
        (status = 200, description = "Consultation approved", body = ConsultationRes),
        (status = 400, description = "Missing or unknown `doenca`, or unknown recommendation", body = ErrorBody),
        (status = 404, description = "No such consultation", body = ErrorBody),
        (status = 409, description = "Consultation is cancelled or done", body = ErrorBody)
    )
)]
/// Alias of the approve endpoint.
#[axum::debug_handler(state = AppState)]
pub async fn validate_diagnosis(
    state: State<AppState>,
    actor: CurrentActor,
    id: Path<String>,
    body: Result<Json<ApproveReq>, JsonRejection>,
) -> Result<Json<ConsultationRes>, ApiError> {
    approve(state, actor, id, body).await
}

#[utoipa::path(
    put,
    path = "/consultas/{id}/cancel",
    params(
        ("id" = String, Path, description = "Consultation id"),
        ("x-actor-id" = String, Header, description = "Doctor id"),
        ("x-actor-role" = String, Header, description = "Must be `doctor`")
    ),
    responses(
        (status = 200, description = "Consultation cancelled", body = ConsultationRes),
        (status = 404, description = "No such consultation", body = ErrorBody),
        (status = 409, description = "Consultation is already cancelled or done", body = ErrorBody)
    )
)]
/// Cancel a consultation
#[axum::debug_handler(state = AppState)]
pub async fn cancel(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<ConsultationRes>, ApiError> {
    let doctor_id = actor.require_doctor()?;
    let id = ConsultationId::parse(&id)?;
    let cancelled = state
        .service
        .cancel(id, doctor_id)
        .inspect_err(|e| log_failure("cancel consultation", e))?;
    Ok(Json(ConsultationRes::from(&cancelled)))
}

#[utoipa::path(
    put,
    path = "/consultas/{id}/mark-as-done",
    params(
        ("id" = String, Path, description = "Consultation id"),
        ("x-actor-id" = String, Header, description = "Doctor id"),
        ("x-actor-role" = String, Header, description = "Must be `doctor`")
    ),
    responses(
        (status = 200, description = "Consultation completed", body = ConsultationRes),
        (status = 404, description = "No such consultation", body = ErrorBody),
        (status = 409, description = "Consultation is already cancelled or done", body = ErrorBody)
    )
)]
/// Mark a consultation as done
#[axum::debug_handler(state = AppState)]
pub async fn mark_as_done(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<ConsultationRes>, ApiError> {
    let doctor_id = actor.require_doctor()?;
    let id = ConsultationId::parse(&id)?;
    let done = state
        .service
        .mark_as_done(id, doctor_id)
        .inspect_err(|e| log_failure("complete consultation", e))?;
    Ok(Json(ConsultationRes::from(&done)))
}

#[utoipa::path(
    get,
    path = "/consultas/{id}/recommendations",
    params(
        ("id" = String, Path, description = "Consultation id"),
        ("x-actor-id" = String, Header, description = "Caller id"),
        ("x-actor-role" = String, Header, description = "`patient` or `doctor`")
    ),
    responses(
        (status = 200, description = "Disease recommendations first, then symptom ones", body = RecommendationListRes),
        (status = 403, description = "Consultation belongs to another patient", body = ErrorBody),
        (status = 404, description = "No such consultation, or no disease chosen yet", body = ErrorBody)
    )
)]
/// Aggregated recommendations
#[axum::debug_handler(state = AppState)]
pub async fn recommendations(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<RecommendationListRes>, ApiError> {
    let consultation = visible_consultation(&state, &actor, &id)?;
    let merged = state
        .service
        .recommendations(consultation.id)
        .inspect_err(|e| log_failure("aggregate recommendations", e))?;
    Ok(Json(RecommendationListRes {
        data: merged.iter().map(RecommendationRes::from).collect(),
    }))
}

/// Loads a consultation the caller is allowed to see.
fn visible_consultation(
    state: &AppState,
    actor: &Actor,
    raw_id: &str,
) -> Result<Consultation, ApiError> {
    let id = ConsultationId::parse(raw_id)?;
    let consultation = state
        .service
        .get(id)
        .inspect_err(|e| log_failure("read consultation", e))?;
    actor.ensure_can_view(consultation.patient_id)?;
    Ok(consultation)
}

fn approval_from_request(req: ApproveReq) -> Result<Approval, ApiError> {
    let disease = req
        .doenca
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::BadRequest("doenca is required".into()))?;

    let medical_recommendation_ids = req
        .recomendacoes_medicos
        .map(|ids| {
            ids.iter()
                .map(|id| RecommendationId::parse(id.trim()))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    Ok(Approval {
        disease_id: DiseaseId::parse(disease)?,
        medical_recommendation_ids,
        free_recommendations: req.recomendacoes_livres,
        notes: req.notas,
        final_diagnosis: req.diagnostico_final,
    })
}

/// Internal failures are logged here; client errors are expected traffic.
fn log_failure(action: &str, err: &triage_core::TriageError) {
    if !err.is_client_error() {
        tracing::error!("{} error: {:?}", action, err);
    }
}
