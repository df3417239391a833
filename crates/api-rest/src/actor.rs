use crate::error::ApiError;
use api_shared::auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use api_shared::Actor;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Extractor for the caller resolved by the upstream gateway.
///
/// Rejects with `401` when the identity headers are missing or malformed.
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());
        let actor = Actor::from_headers(header(ACTOR_ID_HEADER), header(ACTOR_ROLE_HEADER))?;
        Ok(CurrentActor(actor))
    }
}
