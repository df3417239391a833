use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use triage_catalog::{Catalog, CatalogStore};
use triage_core::{
    ConsultationRepository, ConsultationService, CoreConfig, DisabledExtractor,
    FileConsultationRepository, InMemoryConsultationRepository, OllamaExtractor,
    SymptomExtractor,
};

/// Main entry point for the triage service
///
/// Loads the catalog, opens the consultation store and serves the REST API.
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `TRIAGE_CATALOG_PATH`: catalog YAML file (required)
/// - `TRIAGE_DATA_DIR`: directory for consultation files (unset: in-memory store)
/// - `TRIAGE_DIAGNOSIS_TOP_K`, `TRIAGE_PENDING_TOP_K`: candidate limits (default: 15 and 10)
/// - `TRIAGE_EXTRACTOR_URL`, `TRIAGE_EXTRACTOR_MODEL`, `TRIAGE_EXTRACTOR_TIMEOUT_SECS`: symptom
///   extraction from free text (disabled when the URL is unset)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, catalog loading or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    let rest_addr = std::env::var("TRIAGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let catalog: Arc<dyn CatalogStore> = Arc::new(Catalog::load(cfg.catalog_path())?);

    let repository: Arc<dyn ConsultationRepository> = match cfg.consultations_dir() {
        Some(dir) => {
            tracing::info!("++ Storing consultations under {}", dir.display());
            Arc::new(FileConsultationRepository::open(dir)?)
        }
        None => {
            tracing::warn!("TRIAGE_DATA_DIR not set; consultations are kept in memory only");
            Arc::new(InMemoryConsultationRepository::new())
        }
    };

    let extractor: Arc<dyn SymptomExtractor> = match cfg.extractor() {
        Some(extractor_cfg) => {
            tracing::info!(
                "++ Symptom extraction via {} ({})",
                extractor_cfg.base_url,
                extractor_cfg.model
            );
            Arc::new(OllamaExtractor::new(extractor_cfg)?)
        }
        None => Arc::new(DisabledExtractor),
    };

    let service = ConsultationService::new(&cfg, catalog, repository, extractor);
    api_rest::serve(&rest_addr, AppState { service }).await?;

    Ok(())
}
