//! Maps [`ApiError`] onto HTTP responses (spec §7). A local wrapper is
//! required because neither `ApiError` nor axum's `IntoResponse` trait is
//! defined in this crate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use smallocator_types::{ApiError, StatusClass};

pub struct ApiErrorResponse(pub ApiError);

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.0.status_class() {
            StatusClass::BadRequest => StatusCode::BAD_REQUEST,
            StatusClass::Unauthorized => StatusCode::UNAUTHORIZED,
            StatusClass::Forbidden => StatusCode::FORBIDDEN,
            StatusClass::NotFound => StatusCode::NOT_FOUND,
            StatusClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// For lookups the validation pipeline never raises (unknown compact/lock).
pub fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}
