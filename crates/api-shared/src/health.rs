use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Liveness reporting shared by every API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Static health check; does not touch the catalog or the store.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is alive.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Triage is alive".into(),
        }
    }
}
