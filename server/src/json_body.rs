//! A `Json<T>` extractor that surfaces deserialize failures as the same
//! `{"error": ...}` envelope every other response uses (spec.md §6 "all
//! responses JSON"), instead of axum's default plain-text rejection body.
//! Malformed `arbiter`/`sponsor`/`amount` fields are tagged `BadAddress:`/
//! `BadAmount:` by their custom deserializers in `smallocator-types::compact`
//! and are recovered here as the matching [`ApiError`] variant; anything
//! else becomes a generic `400`.

use axum::extract::{FromRequest, Request, RequestExt};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use smallocator_types::ApiError;

use crate::error_response::ApiErrorResponse;

pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let result: Result<Json<T>, axum::extract::rejection::JsonRejection> =
            req.extract_with_state(state).await;
        match result {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                let message = rejection.to_string();
                if let Some(detail) = message.split("BadAddress:").nth(1) {
                    return Err(ApiErrorResponse::from(ApiError::BadAddress(detail.to_string())).into_response());
                }
                if let Some(detail) = message.split("BadAmount:").nth(1) {
                    return Err(ApiErrorResponse::from(ApiError::BadAmount(detail.to_string())).into_response());
                }
                Err((StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response())
            }
        }
    }
}
