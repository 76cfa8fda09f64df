//! Authenticated identity extractor.
//!
//! The auth/session layer is an upstream collaborator: the gateway
//! authenticates the user and forwards `X-User-ID`, `X-User-Role`, and
//! `X-Org-ID` headers, which this service trusts for `created_by`
//! attribution and organization scoping. Requests without them are rejected.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

/// Identity supplied by the gateway for every request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: String,
    pub org_id: Uuid,
}

fn header_uuid(parts: &Parts, name: &'static str) -> Result<Uuid, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing {} header", name)))?
        .parse()
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_uuid(parts, "X-User-ID")?;
        let org_id = header_uuid(parts, "X-Org-ID")?;
        let role = parts
            .headers
            .get("X-User-Role")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing X-User-Role header")))?
            .to_string();

        Ok(Identity {
            user_id,
            role,
            org_id,
        })
    }
}
