//! `x-session-id` header authentication (spec §6 "Authentication header").

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use smallocator_core::session_service;
use smallocator_types::{ApiError, Session};
use uuid::Uuid;

use crate::error_response::ApiErrorResponse;
use crate::state::AppState;

pub struct Authenticated(pub Session);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::SessionMissing)?;
        let session_id = Uuid::parse_str(header).map_err(|_| ApiError::SessionInvalid)?;
        let session = session_service::verify(&state.pool, session_id).await?;
        Ok(Authenticated(session))
    }
}
