//! # API REST
//!
//! REST API for the triage service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, caller headers, error envelopes, CORS)
//!
//! Uses `api-shared` for wire types and `triage-core` for all behaviour.

#![warn(rust_2018_idioms)]

mod actor;
pub mod error;
pub mod handlers;

use api_shared::dto::{
    ApproveReq, CandidateListRes, CandidateRes, ConsultationListRes, ConsultationRes,
    CreateConsultationReq, CreateConsultationRes, ErrorBody, ErrorDetail, PendingConsultationRes,
    PendingListRes, RecommendationListRes, RecommendationRes,
};
use api_shared::HealthRes;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use triage_core::ConsultationService;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use actor::CurrentActor;
pub use error::ApiError;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: ConsultationService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_consultation,
        handlers::pending,
        handlers::reports,
        handlers::get_consultation,
        handlers::diagnosis,
        handlers::approve,
        handlers::validate_diagnosis,
        handlers::cancel,
        handlers::mark_as_done,
        handlers::recommendations,
    ),
    components(schemas(
        HealthRes,
        CreateConsultationReq,
        CreateConsultationRes,
        ApproveReq,
        CandidateRes,
        CandidateListRes,
        ConsultationRes,
        ConsultationListRes,
        PendingConsultationRes,
        PendingListRes,
        RecommendationRes,
        RecommendationListRes,
        ErrorBody,
        ErrorDetail,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST router, Swagger UI included.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/consultas", post(handlers::create_consultation))
        .route("/consultas/pending", get(handlers::pending))
        .route("/consultas/reports", get(handlers::reports))
        .route("/consultas/:id", get(handlers::get_consultation))
        .route("/consultas/:id/diagnosis", get(handlers::diagnosis))
        .route("/consultas/:id/approve", put(handlers::approve))
        .route(
            "/consultas/:id/validate-diagnosis",
            put(handlers::validate_diagnosis),
        )
        .route("/consultas/:id/cancel", put(handlers::cancel))
        .route("/consultas/:id/mark-as-done", put(handlers::mark_as_done))
        .route("/consultas/:id/recommendations", get(handlers::recommendations))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the router until the process stops.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    tracing::info!("++ Starting triage REST on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await
}
