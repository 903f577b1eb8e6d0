//! Error types for the analytics service.
//!
//! - `StoreError`: a data-access failure raised by a store adapter. Metric
//!   functions convert it into a default value, so it never reaches a client.
//! - `AnalyticsError`: a failure of the fan-out itself, outside any single metric.
//! - `ApiError`: what the HTTP layer sends back when a request cannot be served.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::models::ApiResponse;
use crate::store::QueryKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("data store unavailable: {0}")]
    Unavailable(String),

    #[error("injected failure for {0:?} query")]
    Injected(QueryKind),
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("metric task `{metric}` did not complete: {source}")]
    TaskJoin {
        metric: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("failed to build {side} report for comparison: {source}")]
    Comparison {
        side: &'static str,
        #[source]
        source: Box<AnalyticsError>,
    },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, label) = match &self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Analytics(e) => {
                error!("Report request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = ApiResponse::<()>::failure(label, self.to_string());
        (status, Json(body)).into_response()
    }
}
