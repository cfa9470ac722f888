//! The `/_api` sub-router.
//!
//! A deliberately small surface: liveness, build metadata, and an RFC 7807
//! problem-details fallback for unknown API paths. Everything under `/_api`
//! still passes through the security-header middleware applied at the
//! application root.

use axum::{
    extract::{Extension, OriginalUri},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Serialize, Serializer};

use crate::build_info::BuildInfo;

/// Serialize a `StatusCode` as its `u16` representation.
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires `&T` signature
fn serialize_status_code<S: Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

/// RFC 7807 Problem Details error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// URI reference identifying the problem type
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short human-readable summary
    pub title: String,
    /// HTTP status code
    #[serde(serialize_with = "serialize_status_code")]
    pub status: StatusCode,
    /// Human-readable explanation specific to this occurrence
    pub detail: String,
    /// URI reference identifying the specific occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ProblemDetails {
    /// Create a not-found response for an unknown API path.
    #[must_use]
    pub fn not_found(instance: &str) -> Self {
        Self {
            problem_type: "https://ironhat.dev/errors/not-found".to_string(),
            title: "Not Found".to_string(),
            status: StatusCode::NOT_FOUND,
            detail: "The requested API route does not exist".to_string(),
            instance: Some(instance.to_string()),
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

/// Build the `/_api` router.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/app-info", get(get_app_info))
        .fallback(api_not_found)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Return metadata about the running service.
#[allow(clippy::unused_async)] // Required for Axum handler signature
async fn get_app_info(Extension(build_info): Extension<BuildInfo>) -> Json<BuildInfo> {
    Json(build_info)
}

// The nest at /_api strips the prefix from the request URI before this
// router runs; OriginalUri preserves the full client-facing path for the
// problem-details instance field.
#[allow(clippy::unused_async)] // Required for Axum handler signature
async fn api_not_found(OriginalUri(uri): OriginalUri) -> ProblemDetails {
    ProblemDetails::not_found(uri.path())
}
