//! Admin REST surface: thin handlers over [`CatalogEngine`] and the job registry.

use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::set_header::response::SetResponseHeaderLayer;
use tracing::error;

use crate::engine::CatalogEngine;
use crate::error::EngineError;
use crate::jobs::JobDispatcher;

pub mod dto;
pub mod handlers;

// ---------- shared state ----------

#[derive(Clone)]
pub struct AppState {
    pub engine: CatalogEngine,
    pub jobs: JobDispatcher,
}

impl AppState {
    pub fn new(jobs: JobDispatcher) -> Self {
        Self {
            engine: jobs.engine().clone(),
            jobs,
        }
    }
}

// ---------- error type ----------

/// A JSON error response: `{"error": "..."}` with an HTTP status.
#[derive(Debug)]
pub struct ApiErr(StatusCode, String);

impl ApiErr {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(status, msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(StatusCode::NOT_FOUND, msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(StatusCode::CONFLICT, msg.into())
    }

    pub fn status(&self) -> StatusCode {
        self.0
    }
}

impl From<EngineError> for ApiErr {
    fn from(e: EngineError) -> Self {
        let status = match &e {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            EngineError::Cancelled => StatusCode::CONFLICT,
            EngineError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Store(_) | EngineError::Encode(_) => {
                error!(error = %e, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self(status, e.to_string())
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.1 });
        (self.0, Json(body)).into_response()
    }
}

// ---------- router ----------

pub fn api_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let allowed_origins: Vec<HeaderValue> = cors_allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new() // no origins allowed = same-origin only
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/api/v1", api_v1())
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .with_state(state)
}

fn api_v1() -> Router<AppState> {
    Router::new()
        // jobs against a connection
        .route("/connections/{id}/sync", post(handlers::submit_sync))
        .route("/connections/{id}/discover", post(handlers::submit_discover))
        .route("/connections/{id}/assess", post(handlers::submit_assess_connection))
        .route("/connections/{id}/test", post(handlers::test_connection))
        .route("/connections/{id}/disconnect", post(handlers::disconnect))
        .route("/tables/{id}/assess", post(handlers::submit_assess_table))
        .route(
            "/jobs/{job_id}",
            get(handlers::job_status).delete(handlers::cancel_job),
        )
        // quality
        .route("/quality/overview", get(handlers::quality_overview))
        .route("/tables/{id}/quality", get(handlers::table_quality))
        .route("/issues", get(handlers::list_issues))
        .route("/issues/{id}/resolve", post(handlers::resolve_issue))
        // lineage
        .route("/lineage", get(handlers::lineage_graph))
        .route("/lineage/impact/{table_id}", get(handlers::impact))
}
